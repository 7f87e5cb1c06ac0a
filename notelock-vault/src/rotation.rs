//! Key rotation.
//!
//! Each procedure computes every new artifact in memory and returns it
//! without persisting anything. On error nothing is returned, so the
//! caller's stored artifacts stay as they were.

use crate::error::VaultResult;
use crate::hierarchy::KeyHierarchy;
use crate::record::{Record, Tier};
use notelock_crypto::keypair::{self, PrivateKey, PublicKey};
use notelock_crypto::master::{self, MasterKey};
use notelock_crypto::{CryptoError, KdfParams};
use tracing::{debug, info};

/// Output of [`rotate_master_key`].
#[derive(Debug)]
pub struct MasterRotation {
    /// The new master key, wrapped to the unchanged public key.
    pub wrapped_master_key: String,
    /// Every input record re-encrypted under the new master key, in input
    /// order. Password-only records are passed through untouched.
    pub records: Vec<Record>,
}

/// Re-seals the private key under `new_password`. The master key and all
/// records are untouched.
pub fn rotate_password(
    hierarchy: &KeyHierarchy,
    old_password: &str,
    new_password: &str,
    params: &KdfParams,
) -> VaultResult<KeyHierarchy> {
    let keypair = keypair::rewrap(old_password, new_password, &hierarchy.keypair, params)?;
    debug!("rewrapped private key under new password");
    Ok(KeyHierarchy {
        keypair,
        ..hierarchy.clone()
    })
}

/// Replaces the keypair and moves the existing master key under the new
/// public key. The password and the master key itself are unchanged.
pub fn rotate_asymmetric_keys(
    hierarchy: &KeyHierarchy,
    password: &str,
    params: &KdfParams,
) -> VaultResult<KeyHierarchy> {
    let old_private = keypair::unlock(password, &hierarchy.keypair)?;
    let new_private = PrivateKey::generate();
    let keypair = keypair::wrap(&new_private, password, params)?;

    // The old private key is still alive here; it must outlive the rewrap.
    let wrapped_master_key =
        master::rewrap(&old_private, &keypair.public_key, &hierarchy.wrapped_master_key)?;
    verify_wrap(&new_private, &wrapped_master_key, &old_master(&old_private, hierarchy)?)?;

    info!("rotated asymmetric keypair");
    Ok(KeyHierarchy {
        keypair,
        wrapped_master_key,
        created_at: hierarchy.created_at,
    })
}

/// Generates a new master key, wraps it to `public_key` and re-encrypts
/// every record that depended on the old one.
///
/// Master-wrapped records come out field-specific. Any record that fails
/// to decrypt aborts the whole rotation.
pub fn rotate_master_key(
    private_key: &PrivateKey,
    public_key: &PublicKey,
    wrapped_master_key: &str,
    records: &[Record],
) -> VaultResult<MasterRotation> {
    let old_master_key = master::unwrap(private_key, wrapped_master_key)?;
    let (new_master_key, new_wrapped) = master::create(public_key)?;
    verify_wrap(private_key, &new_wrapped, &new_master_key)?;

    let records = records
        .iter()
        .map(|record| match record.tier {
            Tier::PasswordOnly => Ok(record.clone()),
            Tier::MasterWrapped | Tier::FieldSpecific => {
                let plaintext = record.open_with_master(&old_master_key)?;
                Record::seal_field_specific(
                    &record.owner,
                    &record.field_id,
                    &plaintext,
                    &new_master_key,
                )
            }
        })
        .collect::<VaultResult<Vec<_>>>()?;

    info!("rotated master key, re-encrypted {} record(s)", records.len());
    Ok(MasterRotation {
        wrapped_master_key: new_wrapped,
        records,
    })
}

/// Re-encrypts one record under a freshly salted field key. Every other
/// field is unaffected.
pub fn rotate_field_key(master_key: &MasterKey, record: &Record) -> VaultResult<Record> {
    let plaintext = record.open_with_master(master_key)?;
    let rotated =
        Record::seal_field_specific(&record.owner, &record.field_id, &plaintext, master_key)?;
    debug!("rotated field key for {}", record.field_id);
    Ok(rotated)
}

fn old_master(private_key: &PrivateKey, hierarchy: &KeyHierarchy) -> VaultResult<MasterKey> {
    Ok(master::unwrap(private_key, &hierarchy.wrapped_master_key)?)
}

/// Checks that `wrapped` unwraps with `private_key` to exactly `expected`.
fn verify_wrap(private_key: &PrivateKey, wrapped: &str, expected: &MasterKey) -> VaultResult<()> {
    let unwrapped = master::unwrap(private_key, wrapped)?;
    if unwrapped.as_bytes() != expected.as_bytes() {
        return Err(CryptoError::UnwrapFailed.into());
    }
    Ok(())
}
