//! Password-only encryption: password → KDF(salt) → AEAD.
//!
//! Every call draws a fresh salt, so each derived key seals exactly one
//! message.

use crate::blob::{self, CipherBlob};
use crate::cipher::{self, Nonce};
use crate::error::CryptoResult;
use crate::key::{KdfParams, Salt, derive_key};
use zeroize::Zeroizing;

/// Encrypts `plaintext` under `password`, returning a blob token.
pub fn encrypt_with_password(
    plaintext: &[u8],
    password: &str,
    aad: &[u8],
    params: &KdfParams,
) -> CryptoResult<String> {
    let salt = Salt::random();
    let nonce = Nonce::random();
    let key = derive_key(password, &salt, params)?;
    let ciphertext = cipher::seal(plaintext, &key, &nonce, aad)?;
    Ok(blob::encode(&salt, &nonce, &ciphertext))
}

/// Decrypts a token produced by [`encrypt_with_password`].
///
/// The token is parsed before the (expensive) derivation runs, so malformed
/// input fails fast with `MalformedBlob`.
pub fn decrypt_with_password(
    token: &str,
    password: &str,
    aad: &[u8],
    params: &KdfParams,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let parsed = CipherBlob::decode(token)?;
    let key = derive_key(password, &parsed.salt, params)?;
    cipher::open(&parsed.ciphertext, &key, &parsed.nonce, aad)
}

/// String convenience over [`encrypt_with_password`].
pub fn encrypt_string(
    plaintext: &str,
    password: &str,
    aad: &str,
    params: &KdfParams,
) -> CryptoResult<String> {
    encrypt_with_password(plaintext.as_bytes(), password, aad.as_bytes(), params)
}

/// String convenience over [`decrypt_with_password`].
///
/// Invalid UTF-8 after successful authentication is reported as a malformed
/// blob; it can only come from a writer that sealed non-text bytes.
pub fn decrypt_string(
    token: &str,
    password: &str,
    aad: &str,
    params: &KdfParams,
) -> CryptoResult<Zeroizing<String>> {
    let bytes = decrypt_with_password(token, password, aad.as_bytes(), params)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| crate::CryptoError::MalformedBlob(format!("plaintext is not utf-8: {e}")))?;
    Ok(Zeroizing::new(text.to_owned()))
}
