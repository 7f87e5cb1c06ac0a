//! Random master key, wrapped under an X25519 public key.
//!
//! Wrapping is an ECIES construction that fits the standard blob layout:
//!
//! ```text
//! shared = X25519(ephemeral_secret, recipient_public)
//! kek    = HKDF-SHA256(salt = blob.salt, ikm = shared,
//!                      info = label || ephemeral_public || recipient_public)
//! blob.ciphertext = ephemeral_public[32] || ChaCha20-Poly1305(kek, master_key)
//! ```
//!
//! Every failure on the unwrap side collapses into [`CryptoError::UnwrapFailed`].

use crate::blob::{self, CipherBlob};
use crate::cipher::{self, Nonce, TAG_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KEY_SIZE, Salt, generate_random_key};
use crate::keypair::{PrivateKey, PublicKey, X25519_KEY_SIZE};
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

const WRAP_INFO_LABEL: &[u8] = b"notelock/master-key-wrap/v1:";

/// The random 256-bit master key. Zeroized on drop; not `Clone`.
pub struct MasterKey(DerivedKey);

impl MasterKey {
    /// Generates a fresh master key.
    pub fn generate() -> Self {
        Self(generate_random_key())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        self.0.as_bytes()
    }

    pub(crate) fn as_derived(&self) -> &DerivedKey {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

fn binding(ephemeral_public: &PublicKey, recipient_public: &PublicKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * X25519_KEY_SIZE);
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(recipient_public.as_bytes());
    out
}

fn key_encryption_key(
    shared: &[u8; X25519_KEY_SIZE],
    salt: &Salt,
    binding: &[u8],
) -> CryptoResult<DerivedKey> {
    let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), shared);
    let mut info = Vec::with_capacity(WRAP_INFO_LABEL.len() + binding.len());
    info.extend_from_slice(WRAP_INFO_LABEL);
    info.extend_from_slice(binding);

    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(&info, &mut okm[..])
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
    Ok(DerivedKey::from_bytes(*okm))
}

/// Generates a master key and wraps it for `public_key`.
pub fn create(public_key: &PublicKey) -> CryptoResult<(MasterKey, String)> {
    let master_key = MasterKey::generate();
    let wrapped = wrap(&master_key, public_key)?;
    Ok((master_key, wrapped))
}

/// Wraps an existing master key for `public_key` with a fresh ephemeral key.
pub fn wrap(master_key: &MasterKey, public_key: &PublicKey) -> CryptoResult<String> {
    let ephemeral = PrivateKey::generate();
    let ephemeral_public = ephemeral.public_key();
    let shared = ephemeral.diffie_hellman(public_key);
    if !shared.was_contributory() {
        return Err(CryptoError::Encryption(
            "recipient public key is not a valid X25519 point".to_string(),
        ));
    }

    let salt = Salt::random();
    let nonce = Nonce::random();
    let aad = binding(&ephemeral_public, public_key);
    let kek = key_encryption_key(shared.as_bytes(), &salt, &aad)?;
    let sealed = cipher::seal(master_key.as_bytes(), &kek, &nonce, &aad)?;

    let mut body = Vec::with_capacity(X25519_KEY_SIZE + sealed.len());
    body.extend_from_slice(ephemeral_public.as_bytes());
    body.extend_from_slice(&sealed);
    Ok(blob::encode(&salt, &nonce, &body))
}

/// Recovers the master key with the matching private key.
pub fn unwrap(private_key: &PrivateKey, wrapped: &str) -> CryptoResult<MasterKey> {
    let parsed = CipherBlob::decode(wrapped).map_err(|_| CryptoError::UnwrapFailed)?;
    if parsed.ciphertext.len() != X25519_KEY_SIZE + KEY_SIZE + TAG_SIZE {
        return Err(CryptoError::UnwrapFailed);
    }

    let (ephemeral_bytes, sealed) = parsed.ciphertext.split_at(X25519_KEY_SIZE);
    let mut ephemeral = [0u8; X25519_KEY_SIZE];
    ephemeral.copy_from_slice(ephemeral_bytes);
    let ephemeral_public = PublicKey::from_bytes(ephemeral);

    let shared = private_key.diffie_hellman(&ephemeral_public);
    if !shared.was_contributory() {
        return Err(CryptoError::UnwrapFailed);
    }

    let aad = binding(&ephemeral_public, &private_key.public_key());
    let kek = key_encryption_key(shared.as_bytes(), &parsed.salt, &aad)
        .map_err(|_| CryptoError::UnwrapFailed)?;
    let plaintext = cipher::open(sealed, &kek, &parsed.nonce, &aad)
        .map_err(|_| CryptoError::UnwrapFailed)?;
    let key = DerivedKey::from_slice(&plaintext).map_err(|_| CryptoError::UnwrapFailed)?;
    Ok(MasterKey(key))
}

/// Moves a wrapped master key from one keypair to another without
/// generating a new master key.
pub fn rewrap(
    old_private_key: &PrivateKey,
    new_public_key: &PublicKey,
    wrapped: &str,
) -> CryptoResult<String> {
    let master_key = unwrap(old_private_key, wrapped)?;
    wrap(&master_key, new_public_key)
}

/// Encrypts data directly under the master key (the `master-wrapped` tier).
///
/// The blob's salt slot is filled with random bytes; it plays no part in
/// key selection for this tier.
pub fn seal_with_master(master_key: &MasterKey, plaintext: &[u8], aad: &[u8]) -> CryptoResult<String> {
    let salt = Salt::random();
    let nonce = Nonce::random();
    let ciphertext = cipher::seal(plaintext, master_key.as_derived(), &nonce, aad)?;
    Ok(blob::encode(&salt, &nonce, &ciphertext))
}

/// Decrypts a token produced by [`seal_with_master`].
pub fn open_with_master(
    master_key: &MasterKey,
    token: &str,
    aad: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let parsed = CipherBlob::decode(token)?;
    cipher::open(&parsed.ciphertext, master_key.as_derived(), &parsed.nonce, aad)
}
