//! Per-field keys derived from the master key.
//!
//! `FieldKey = HKDF-SHA256(salt = field_salt, ikm = master_key, info = label || field_id)`
//!
//! Field salts are random and stored with each field (in the blob's salt
//! slot), so a single field can be re-keyed without touching the others.

use crate::blob::{self, CipherBlob};
use crate::cipher::{self, Nonce};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KEY_SIZE, Salt};
use crate::master::MasterKey;
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

const FIELD_INFO_LABEL: &[u8] = b"notelock/field-key/v1:";

/// A key scoped to one field and one field salt.
///
/// Sealing consumes the key, so a given instance encrypts at most one
/// message. Re-encrypting a field means deriving a new key from a new salt.
pub struct FieldKey {
    key: DerivedKey,
    salt: Salt,
}

impl FieldKey {
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        self.key.as_bytes()
    }

    /// Encrypts `plaintext` and returns a blob token whose salt slot holds
    /// this key's field salt.
    pub fn seal(self, plaintext: &[u8], aad: &[u8]) -> CryptoResult<String> {
        let nonce = Nonce::random();
        let ciphertext = cipher::seal(plaintext, &self.key, &nonce, aad)?;
        Ok(blob::encode(&self.salt, &nonce, &ciphertext))
    }

    /// Decrypts an already-parsed blob. The blob's salt must be this key's salt.
    pub fn open(&self, parsed: &CipherBlob, aad: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if parsed.salt != self.salt {
            return Err(CryptoError::AuthenticationFailed);
        }
        cipher::open(&parsed.ciphertext, &self.key, &parsed.nonce, aad)
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKey")
            .field("salt", &self.salt)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derives the key for `field_id` under `field_salt`. Deterministic.
pub fn derive_field_key(
    master_key: &MasterKey,
    field_salt: &Salt,
    field_id: &str,
) -> CryptoResult<FieldKey> {
    let hk = Hkdf::<Sha256>::new(Some(field_salt.as_bytes()), master_key.as_bytes());
    let mut info = Vec::with_capacity(FIELD_INFO_LABEL.len() + field_id.len());
    info.extend_from_slice(FIELD_INFO_LABEL);
    info.extend_from_slice(field_id.as_bytes());

    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(&info, &mut okm[..])
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;

    Ok(FieldKey {
        key: DerivedKey::from_bytes(*okm),
        salt: *field_salt,
    })
}

/// Seals `plaintext` for `field_id` under a freshly salted field key.
pub fn seal_field(
    master_key: &MasterKey,
    field_id: &str,
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<String> {
    derive_field_key(master_key, &Salt::random(), field_id)?.seal(plaintext, aad)
}

/// Opens a field token, re-deriving its key from the salt it carries.
pub fn open_field(
    master_key: &MasterKey,
    field_id: &str,
    token: &str,
    aad: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let parsed = CipherBlob::decode(token)?;
    derive_field_key(master_key, &parsed.salt, field_id)?.open(&parsed, aad)
}
