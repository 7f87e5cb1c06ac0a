//! Vault error types.

use notelock_crypto::CryptoError;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault not initialized")]
    NotInitialized,

    #[error("vault already initialized")]
    AlreadyInitialized,

    #[error("password too short (min {min} characters)")]
    PasswordTooShort { min: usize },

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record {field_id} is inconsistent: {reason}")]
    InconsistentRecord { field_id: String, reason: String },

    #[error("migration incomplete: {remaining} record(s) not yet field-specific")]
    MigrationIncomplete { remaining: usize },

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl VaultError {
    /// True when the underlying cause is a failed AEAD tag check: wrong
    /// password, wrong associated data, or tampering.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, VaultError::Crypto(CryptoError::AuthenticationFailed))
    }

    /// True when a wrapped master key could not be unwrapped.
    pub fn is_unwrap_failure(&self) -> bool {
        matches!(self, VaultError::Crypto(CryptoError::UnwrapFailed))
    }
}

impl From<duckdb::Error> for VaultError {
    fn from(e: duckdb::Error) -> Self {
        VaultError::Storage(e.to_string())
    }
}
