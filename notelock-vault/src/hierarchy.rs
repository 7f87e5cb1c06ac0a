//! The stored key hierarchy: password → keypair → master key.

use chrono::Utc;
use notelock_crypto::keypair::{self, AsymmetricKeyPair, PrivateKey};
use notelock_crypto::master::{self, MasterKey};
use notelock_crypto::{CryptoResult, KdfParams};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything needed to reach the master key from the password.
///
/// Holds only wrapped material and the clear public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHierarchy {
    pub keypair: AsymmetricKeyPair,
    /// Blob token of the master key wrapped to `keypair.public_key`.
    pub wrapped_master_key: String,
    /// Unix milliseconds when the hierarchy was first created.
    pub created_at: i64,
}

/// Unwrapped keys for the duration of one operation. Zeroized on drop.
#[derive(Debug)]
pub struct UnlockedKeys {
    pub private_key: PrivateKey,
    pub master_key: MasterKey,
}

impl KeyHierarchy {
    /// Creates the keypair, then a master key wrapped to it.
    pub fn bootstrap(password: &str, params: &KdfParams) -> CryptoResult<Self> {
        let keypair = keypair::create(password, params)?;
        let (_master_key, wrapped_master_key) = master::create(&keypair.public_key)?;
        debug!("bootstrapped key hierarchy ({:?})", params.algorithm());
        Ok(Self {
            keypair,
            wrapped_master_key,
            created_at: Utc::now().timestamp_millis(),
        })
    }

    /// Unlocks the private key with `password`, then unwraps the master key.
    pub fn unlock(&self, password: &str) -> CryptoResult<UnlockedKeys> {
        let private_key = keypair::unlock(password, &self.keypair)?;
        let master_key = master::unwrap(&private_key, &self.wrapped_master_key)?;
        Ok(UnlockedKeys {
            private_key,
            master_key,
        })
    }

    /// Convenience for callers that only need the master key.
    pub fn unlock_master(&self, password: &str) -> CryptoResult<MasterKey> {
        Ok(self.unlock(password)?.master_key)
    }
}
