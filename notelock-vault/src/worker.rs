//! Runs the expensive derivation steps on Tokio's blocking pool.
//!
//! Each function takes owned inputs and returns its result through the
//! join handle. Dropping the returned future before it resolves drops the
//! result as soon as the blocking task finishes; nothing is persisted here.

use crate::error::{VaultError, VaultResult};
use crate::hierarchy::{KeyHierarchy, UnlockedKeys};
use crate::migration::{MigrationEngine, MigrationReport};
use crate::record::Record;
use notelock_crypto::{DerivedKey, KdfParams, Salt, Zeroizing, derive_key};
use tokio::task;

async fn run_blocking<T, F>(f: F) -> VaultResult<T>
where
    F: FnOnce() -> VaultResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Worker(e.to_string()))?
}

/// Password → key derivation off the async executor.
pub async fn derive_key_in_worker(
    password: Zeroizing<String>,
    salt: Salt,
    params: KdfParams,
) -> VaultResult<DerivedKey> {
    run_blocking(move || Ok(derive_key(&password, &salt, &params)?)).await
}

/// [`KeyHierarchy::unlock`] off the async executor.
pub async fn unlock_in_worker(
    hierarchy: KeyHierarchy,
    password: Zeroizing<String>,
) -> VaultResult<UnlockedKeys> {
    run_blocking(move || Ok(hierarchy.unlock(&password)?)).await
}

/// [`MigrationEngine::migrate_all`] off the async executor.
pub async fn migrate_in_worker(
    hierarchy: KeyHierarchy,
    records: Vec<Record>,
    password: Zeroizing<String>,
) -> VaultResult<MigrationReport> {
    run_blocking(move || Ok(MigrationEngine::new(&hierarchy).migrate_all(&records, &password)))
        .await
}
