//! Vault configuration.

use notelock_crypto::KdfParams;
use serde::{Deserialize, Serialize};

/// Configuration for a [`NoteVault`](crate::NoteVault).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// KDF parameters for newly written password-derived blobs. Existing
    /// blobs keep the parameters they were written with.
    pub kdf: KdfParams,

    /// Prefix for every key this vault writes to the store.
    pub key_prefix: String,

    /// Minimum password length accepted by `initialize` and `rotate_password`.
    pub min_password_length: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            key_prefix: "notelock".to_string(),
            min_password_length: 8,
        }
    }
}

impl VaultConfig {
    pub(crate) fn hierarchy_key(&self) -> String {
        format!("{}/hierarchy", self.key_prefix)
    }

    pub(crate) fn record_prefix(&self) -> String {
        format!("{}/record/", self.key_prefix)
    }

    pub(crate) fn record_key(&self, field_id: &str) -> String {
        format!("{}/record/{field_id}", self.key_prefix)
    }

    pub(crate) fn backup_prefix(&self) -> String {
        format!("{}/backup/", self.key_prefix)
    }

    pub(crate) fn backup_key(&self, field_id: &str) -> String {
        format!("{}/backup/{field_id}", self.key_prefix)
    }
}
