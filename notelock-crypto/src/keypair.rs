//! Password-protected X25519 keypair.
//!
//! The public half is stored in clear. The private half only ever exists
//! on disk as a blob sealed with a password-derived key, bound (via AAD) to
//! the public key it belongs to.

use crate::blob::CipherBlob;
use crate::cipher::{self, Nonce};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KdfParams, Salt, derive_key, random_bytes};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use x25519_dalek::{SharedSecret, StaticSecret};
use zeroize::Zeroizing;

/// X25519 key size in bytes.
pub const X25519_KEY_SIZE: usize = 32;

const PRIVATE_KEY_AAD_LABEL: &[u8] = b"notelock/private-key/v1:";

/// X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; X25519_KEY_SIZE]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; X25519_KEY_SIZE] {
        &self.0
    }

    pub(crate) fn to_dalek(self) -> x25519_dalek::PublicKey {
        x25519_dalek::PublicKey::from(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&STANDARD.encode(self.0)).finish()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(&encoded).map_err(serde::de::Error::custom)?;
        let arr: [u8; X25519_KEY_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("public key must be 32 bytes"))?;
        Ok(Self(arr))
    }
}

/// X25519 private key. Zeroized on drop (by `x25519-dalek`).
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    /// Generates a fresh private key.
    pub fn generate() -> Self {
        let bytes = Zeroizing::new(random_bytes::<X25519_KEY_SIZE>());
        Self(StaticSecret::from(*bytes))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*x25519_dalek::PublicKey::from(&self.0).as_bytes())
    }

    pub(crate) fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        self.0.diffie_hellman(&their_public.to_dalek())
    }

    fn from_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(bytes))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// Stored form of the keypair: clear public key plus wrapped private key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsymmetricKeyPair {
    pub public_key: PublicKey,
    /// Blob token of the private key sealed under a password-derived key.
    pub wrapped_private_key: String,
    /// Parameters used to derive the wrapping key.
    pub kdf: KdfParams,
}

fn private_key_aad(public_key: &PublicKey) -> Vec<u8> {
    let mut aad = Vec::with_capacity(PRIVATE_KEY_AAD_LABEL.len() + X25519_KEY_SIZE);
    aad.extend_from_slice(PRIVATE_KEY_AAD_LABEL);
    aad.extend_from_slice(public_key.as_bytes());
    aad
}

/// Generates a keypair and immediately seals the private half under `password`.
pub fn create(password: &str, params: &KdfParams) -> CryptoResult<AsymmetricKeyPair> {
    let private_key = PrivateKey::generate();
    wrap(&private_key, password, params)
}

/// Seals an existing private key under `password` with a fresh salt and nonce.
pub fn wrap(
    private_key: &PrivateKey,
    password: &str,
    params: &KdfParams,
) -> CryptoResult<AsymmetricKeyPair> {
    let public_key = private_key.public_key();
    let salt = Salt::random();
    let nonce = Nonce::random();
    let wrapping_key = derive_key(password, &salt, params)?;

    let secret_bytes = Zeroizing::new(private_key.0.to_bytes());
    let ciphertext = cipher::seal(
        &secret_bytes[..],
        &wrapping_key,
        &nonce,
        &private_key_aad(&public_key),
    )?;

    Ok(AsymmetricKeyPair {
        public_key,
        wrapped_private_key: CipherBlob::new(salt, nonce, ciphertext).encode(),
        kdf: *params,
    })
}

/// Recovers the private key. A wrong password surfaces as `AuthenticationFailed`.
pub fn unlock(password: &str, pair: &AsymmetricKeyPair) -> CryptoResult<PrivateKey> {
    let parsed = CipherBlob::decode(&pair.wrapped_private_key)?;
    let wrapping_key = derive_key(password, &parsed.salt, &pair.kdf)?;
    let plaintext = cipher::open(
        &parsed.ciphertext,
        &wrapping_key,
        &parsed.nonce,
        &private_key_aad(&pair.public_key),
    )?;

    let bytes: [u8; X25519_KEY_SIZE] =
        plaintext
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: X25519_KEY_SIZE,
                actual: plaintext.len(),
            })?;
    let bytes = Zeroizing::new(bytes);
    let private_key = PrivateKey::from_bytes(*bytes);

    // Private key must match the stored public key.
    if private_key.public_key() != pair.public_key {
        return Err(CryptoError::AuthenticationFailed);
    }
    Ok(private_key)
}

/// Re-seals the private key under `new_password`. The unwrapped key lives
/// only for the duration of this call.
pub fn rewrap(
    old_password: &str,
    new_password: &str,
    pair: &AsymmetricKeyPair,
    params: &KdfParams,
) -> CryptoResult<AsymmetricKeyPair> {
    let private_key = unlock(old_password, pair)?;
    wrap(&private_key, new_password, params)
}
