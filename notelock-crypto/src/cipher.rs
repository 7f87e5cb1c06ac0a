//! ChaCha20-Poly1305 authenticated encryption with associated data.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, random_bytes};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key};
use zeroize::Zeroizing;

/// Nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size in bytes (128 bits), appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// A 96-bit AEAD nonce. Must never repeat under the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    pub fn random() -> Self {
        Self(random_bytes())
    }

    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Encrypts `plaintext`, binding `aad`. Returns ciphertext with the tag appended.
///
/// Nonce uniqueness is the caller's responsibility.
pub fn seal(plaintext: &[u8], key: &DerivedKey, nonce: &Nonce, aad: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .encrypt(
            chacha20poly1305::Nonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypts and verifies `ciphertext`.
///
/// Any verification failure (wrong key, wrong `aad`, tampering, truncation)
/// yields [`CryptoError::AuthenticationFailed`] with no further detail.
pub fn open(
    ciphertext: &[u8],
    key: &DerivedKey,
    nonce: &Nonce,
    aad: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .decrypt(
            chacha20poly1305::Nonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_random_key;

    #[test]
    fn tag_is_appended() {
        let key = generate_random_key();
        let ct = seal(b"abc", &key, &Nonce::random(), b"").unwrap();
        assert_eq!(ct.len(), 3 + TAG_SIZE);
    }

    #[test]
    fn truncated_below_tag_is_auth_failure() {
        let key = generate_random_key();
        let err = open(&[0u8; TAG_SIZE - 1], &key, &Nonce::random(), b"").unwrap_err();
        assert_eq!(err, CryptoError::AuthenticationFailed);
    }
}
