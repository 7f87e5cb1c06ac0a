//! Password-based key derivation and key material types.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of every symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of a derivation salt in bytes (128 bits).
pub const SALT_SIZE: usize = 16;

/// Fills a fixed-size array from the thread-local CSPRNG.
pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// Random per-derivation salt. Not secret; stored next to its ciphertext.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        Self(random_bytes())
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::MalformedBlob(format!("invalid salt encoding: {e}")))?;
        let arr: [u8; SALT_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::MalformedBlob(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Salt").field(&self.to_base64()).finish()
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Salt::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// 256-bit symmetric key held only in memory.
///
/// Zeroized on drop. Never serialized; `Debug` output is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Builds a key from a slice, rejecting anything that is not exactly
    /// [`KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes: arr })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Generates a random 256-bit key.
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
    rand::rng().fill_bytes(&mut bytes[..]);
    DerivedKey::from_bytes(*bytes)
}

/// Which password hashing function a [`KdfParams`] selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KdfAlgorithm {
    Argon2id,
    Pbkdf2Sha256,
}

/// Explicit cost parameters for password-based key derivation.
///
/// Persisted next to every password-derived blob so that decryption never
/// depends on whatever the current defaults happen to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfParams {
    /// Memory-hard Argon2id (RFC 9106).
    Argon2id {
        /// Memory size in KiB.
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
    /// CPU-hard PBKDF2-HMAC-SHA256.
    Pbkdf2Sha256 { iterations: u32 },
}

impl KdfParams {
    /// OWASP-recommended PBKDF2-HMAC-SHA256 iteration count.
    pub const PBKDF2_DEFAULT_ITERATIONS: u32 = 600_000;

    pub fn pbkdf2() -> Self {
        KdfParams::Pbkdf2Sha256 {
            iterations: Self::PBKDF2_DEFAULT_ITERATIONS,
        }
    }

    /// Highest Argon2id memory cost accepted, in KiB (256 MiB).
    pub const ARGON2_MAX_MEMORY_KIB: u32 = 262_144;

    /// Highest Argon2id time cost accepted.
    pub const ARGON2_MAX_ITERATIONS: u32 = 16;

    /// Highest Argon2id lane count accepted.
    pub const ARGON2_MAX_PARALLELISM: u32 = 16;

    /// Highest PBKDF2 iteration count accepted.
    pub const PBKDF2_MAX_ITERATIONS: u32 = 10_000_000;

    pub fn algorithm(&self) -> KdfAlgorithm {
        match self {
            KdfParams::Argon2id { .. } => KdfAlgorithm::Argon2id,
            KdfParams::Pbkdf2Sha256 { .. } => KdfAlgorithm::Pbkdf2Sha256,
        }
    }

    /// Rejects costs outside the accepted range.
    ///
    /// Parameters are read back from storage next to the blob they protect,
    /// so they are bounded before any work is done with them.
    pub fn validate(&self) -> CryptoResult<()> {
        let fail = |msg: String| Err(CryptoError::DerivationFailed(msg));
        match *self {
            KdfParams::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => {
                if memory_kib > Self::ARGON2_MAX_MEMORY_KIB {
                    return fail(format!(
                        "argon2 memory {memory_kib} KiB exceeds {} KiB",
                        Self::ARGON2_MAX_MEMORY_KIB
                    ));
                }
                if iterations > Self::ARGON2_MAX_ITERATIONS {
                    return fail(format!(
                        "argon2 iterations {iterations} exceed {}",
                        Self::ARGON2_MAX_ITERATIONS
                    ));
                }
                if parallelism > Self::ARGON2_MAX_PARALLELISM {
                    return fail(format!(
                        "argon2 parallelism {parallelism} exceeds {}",
                        Self::ARGON2_MAX_PARALLELISM
                    ));
                }
            }
            KdfParams::Pbkdf2Sha256 { iterations } => {
                if iterations == 0 {
                    return fail("pbkdf2 iteration count must be at least 1".to_string());
                }
                if iterations > Self::PBKDF2_MAX_ITERATIONS {
                    return fail(format!(
                        "pbkdf2 iterations {iterations} exceed {}",
                        Self::PBKDF2_MAX_ITERATIONS
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for KdfParams {
    /// Argon2id with m=19 MiB, t=2, p=1.
    fn default() -> Self {
        KdfParams::Argon2id {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Derives a 256-bit key from a password.
///
/// Deterministic for fixed inputs. Cost is governed entirely by `params`,
/// which must pass [`KdfParams::validate`].
pub fn derive_key(password: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    params.validate()?;
    let mut output = Zeroizing::new([0u8; KEY_SIZE]);

    match *params {
        KdfParams::Argon2id {
            memory_kib,
            iterations,
            parallelism,
        } => {
            let argon_params = Params::new(memory_kib, iterations, parallelism, Some(KEY_SIZE))
                .map_err(|e| CryptoError::DerivationFailed(format!("invalid argon2 params: {e}")))?;
            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
                .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut output[..])
                .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
        }
        KdfParams::Pbkdf2Sha256 { iterations } => {
            pbkdf2::pbkdf2_hmac::<Sha256>(
                password.as_bytes(),
                salt.as_bytes(),
                iterations,
                &mut output[..],
            );
        }
    }

    Ok(DerivedKey::from_bytes(*output))
}
