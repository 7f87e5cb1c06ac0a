//! Blob wire format.
//!
//! A blob is a single text token:
//!
//! ```text
//! base64( salt[16] || nonce[12] || ciphertext[..] )
//! ```
//!
//! Salt and nonce lengths are protocol constants, so no length prefixes are
//! needed; the ciphertext (including its trailing 16-byte tag) is whatever
//! remains. Anything shorter than 29 decoded bytes is rejected before any
//! cryptographic work happens.

use crate::cipher::{NONCE_SIZE, Nonce};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{SALT_SIZE, Salt};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Smallest decoded blob: salt, nonce and at least one ciphertext byte.
pub const MIN_BLOB_LEN: usize = SALT_SIZE + NONCE_SIZE + 1;

/// Parsed form of a blob token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherBlob {
    pub salt: Salt,
    pub nonce: Nonce,
    pub ciphertext: Vec<u8>,
}

impl CipherBlob {
    pub fn new(salt: Salt, nonce: Nonce, ciphertext: Vec<u8>) -> Self {
        Self {
            salt,
            nonce,
            ciphertext,
        }
    }

    /// Serializes this blob into its text token.
    pub fn encode(&self) -> String {
        encode(&self.salt, &self.nonce, &self.ciphertext)
    }

    /// Parses a text token.
    pub fn decode(token: &str) -> CryptoResult<Self> {
        decode(token)
    }
}

/// Concatenates `salt || nonce || ciphertext` and base64-encodes the result.
pub fn encode(salt: &Salt, nonce: &Nonce, ciphertext: &[u8]) -> String {
    let mut raw = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    raw.extend_from_slice(salt.as_bytes());
    raw.extend_from_slice(nonce.as_bytes());
    raw.extend_from_slice(ciphertext);
    STANDARD.encode(raw)
}

/// Splits a text token back into salt, nonce and ciphertext.
pub fn decode(token: &str) -> CryptoResult<CipherBlob> {
    let raw = STANDARD
        .decode(token)
        .map_err(|e| CryptoError::MalformedBlob(format!("invalid base64: {e}")))?;

    if raw.len() < MIN_BLOB_LEN {
        return Err(CryptoError::MalformedBlob(format!(
            "decoded length {} is below minimum {MIN_BLOB_LEN}",
            raw.len()
        )));
    }

    let (salt_bytes, rest) = raw.split_at(SALT_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(salt_bytes);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);

    Ok(CipherBlob {
        salt: Salt::from_bytes(salt),
        nonce: Nonce::from_bytes(nonce),
        ciphertext: ciphertext.to_vec(),
    })
}

/// Reports whether `token` is syntactically a blob. Performs no decryption.
pub fn validate(token: &str) -> bool {
    decode(token).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_salt_then_nonce_then_ciphertext() {
        let salt = Salt::from_bytes([1u8; SALT_SIZE]);
        let nonce = Nonce::from_bytes([2u8; NONCE_SIZE]);
        let token = encode(&salt, &nonce, &[3, 4, 5]);

        let raw = STANDARD.decode(&token).unwrap();
        assert_eq!(&raw[..16], &[1u8; 16]);
        assert_eq!(&raw[16..28], &[2u8; 12]);
        assert_eq!(&raw[28..], &[3, 4, 5]);
    }

    #[test]
    fn exactly_minimum_length_is_accepted() {
        let token = STANDARD.encode([0u8; MIN_BLOB_LEN]);
        let blob = decode(&token).unwrap();
        assert_eq!(blob.ciphertext.len(), 1);
    }

    #[test]
    fn one_byte_short_is_rejected() {
        let token = STANDARD.encode([0u8; MIN_BLOB_LEN - 1]);
        assert!(matches!(decode(&token), Err(CryptoError::MalformedBlob(_))));
        assert!(!validate(&token));
    }
}
