//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by the encryption primitives.
///
/// `AuthenticationFailed` and `UnwrapFailed` carry no detail. A wrong
/// password, wrong associated data and a tampered blob are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The token is not a structurally valid blob.
    #[error("malformed blob: {0}")]
    MalformedBlob(String),

    /// The AEAD tag did not verify.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The key derivation function could not produce a key.
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    /// A wrapped master key could not be unwrapped.
    #[error("key unwrap failed")]
    UnwrapFailed,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Sealing failed (only reachable for inputs beyond the AEAD's limits).
    #[error("encryption failed: {0}")]
    Encryption(String),
}
