//! Encryption layer for notelock.
//!
//! Provides credential-derived encryption using:
//! - Argon2id or PBKDF2-HMAC-SHA256 for key derivation from passwords
//! - ChaCha20-Poly1305 for authenticated encryption
//! - X25519 + HKDF for wrapping the master key
//! - Key material that is zeroized when it goes out of scope
//!
//! # Architecture
//!
//! Keys form a hierarchy, each level protecting the next:
//!
//! 1. **Password**: never stored. Stretched into a wrapping key with the
//!    configured KDF.
//!
//! 2. **Keypair**: X25519. The public half is stored in clear; the private
//!    half is sealed under the password-derived key.
//!
//! 3. **Master Key**: 256 random bits, wrapped to the keypair's public key.
//!
//! 4. **Field Key**: derived from the master key, a per-field salt and the
//!    field id. Never stored.
//!
//! This architecture allows:
//! - Changing the password without touching the master key or any data
//! - Replacing the keypair by re-wrapping only the master key
//! - Re-keying a single field without affecting the others
//!
//! Every ciphertext is carried as a base64 blob of `salt || nonce || ciphertext`
//! (see [`blob`]).

pub mod blob;
mod cipher;
mod error;
pub mod field;
mod key;
pub mod keypair;
pub mod master;
mod password;

pub use blob::{CipherBlob, MIN_BLOB_LEN};
pub use cipher::{NONCE_SIZE, Nonce, TAG_SIZE, open, seal};
pub use error::{CryptoError, CryptoResult};
pub use field::{FieldKey, derive_field_key, open_field, seal_field};
pub use key::{
    DerivedKey, KEY_SIZE, KdfAlgorithm, KdfParams, SALT_SIZE, Salt, derive_key,
    generate_random_key,
};
pub use keypair::{AsymmetricKeyPair, PrivateKey, PublicKey};
pub use master::MasterKey;
pub use password::{decrypt_string, decrypt_with_password, encrypt_string, encrypt_with_password};
pub use zeroize::Zeroizing;
