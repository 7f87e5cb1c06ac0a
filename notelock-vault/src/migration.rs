//! Forward-only migration of records to the field-specific tier.
//!
//! Records are migrated independently. A record that fails to decrypt is
//! reported and left exactly as it was; the batch carries on.

use crate::error::{VaultError, VaultResult};
use crate::hierarchy::KeyHierarchy;
use crate::record::{Record, Tier};
use notelock_crypto::{CryptoError, MasterKey};
use tracing::{debug, info, warn};

/// What happened to one record during a batch migration.
#[derive(Debug)]
pub enum MigrationOutcome {
    /// Re-encrypted from `from` into the field-specific tier.
    Migrated { from: Tier },
    /// Already field-specific; nothing to do.
    AlreadyCurrent,
    /// Left untouched.
    Failed(VaultError),
}

/// Per-record migration result. `record` is the migrated record on success
/// and the original record otherwise.
#[derive(Debug)]
pub struct RecordMigration {
    pub record: Record,
    pub outcome: MigrationOutcome,
}

impl RecordMigration {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, MigrationOutcome::Failed(_))
    }
}

/// Result of [`MigrationEngine::migrate_all`], in input order.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub entries: Vec<RecordMigration>,
}

impl MigrationReport {
    pub fn migrated_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, MigrationOutcome::Migrated { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failed()).count()
    }

    /// True when every record ended up field-specific without error.
    pub fn all_current(&self) -> bool {
        self.entries
            .iter()
            .all(|e| !e.is_failed() && e.record.tier.is_current())
    }

    /// Records that changed and need to be written back.
    pub fn migrated(&self) -> impl Iterator<Item = &RecordMigration> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, MigrationOutcome::Migrated { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Record, &VaultError)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            MigrationOutcome::Failed(err) => Some((&e.record, err)),
            _ => None,
        })
    }

    pub fn into_records(self) -> Vec<Record> {
        self.entries.into_iter().map(|e| e.record).collect()
    }
}

/// Moves records forward through the tiers using one key hierarchy.
pub struct MigrationEngine<'a> {
    hierarchy: &'a KeyHierarchy,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(hierarchy: &'a KeyHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Migrates a single record. Field-specific records come back unchanged.
    pub fn migrate_record(&self, record: &Record, password: &str) -> VaultResult<Record> {
        if record.tier.is_current() {
            record.check_consistency()?;
            return Ok(record.clone());
        }
        let master_key = self.hierarchy.unlock_master(password)?;
        migrate_with(record, password, &master_key)
    }

    /// Migrates every record, reporting failures per record.
    ///
    /// The hierarchy is unlocked at most once, on the first record that
    /// needs it. If that unlock fails, every pending record is reported as
    /// failed with the same cause.
    pub fn migrate_all(&self, records: &[Record], password: &str) -> MigrationReport {
        let mut unlocked: Option<Result<MasterKey, CryptoError>> = None;
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            if record.tier.is_current() {
                entries.push(match record.check_consistency() {
                    Ok(_) => RecordMigration {
                        record: record.clone(),
                        outcome: MigrationOutcome::AlreadyCurrent,
                    },
                    Err(e) => failed(record, e),
                });
                continue;
            }

            let master_key =
                unlocked.get_or_insert_with(|| self.hierarchy.unlock_master(password));
            let result = match master_key {
                Ok(master_key) => migrate_with(record, password, master_key),
                Err(e) => Err(VaultError::Crypto(e.clone())),
            };
            entries.push(match result {
                Ok(migrated) => RecordMigration {
                    record: migrated,
                    outcome: MigrationOutcome::Migrated { from: record.tier },
                },
                Err(e) => failed(record, e),
            });
        }

        let report = MigrationReport { entries };
        info!(
            "migration finished: {} migrated, {} failed, {} total",
            report.migrated_count(),
            report.failed_count(),
            records.len()
        );
        report
    }
}

fn migrate_with(record: &Record, password: &str, master_key: &MasterKey) -> VaultResult<Record> {
    let plaintext = match record.tier {
        Tier::PasswordOnly => record.open_with_password(password)?,
        Tier::MasterWrapped => record.open_with_master(master_key)?,
        Tier::FieldSpecific => return Ok(record.clone()),
    };
    let migrated =
        Record::seal_field_specific(&record.owner, &record.field_id, &plaintext, master_key)?;
    debug!("migrated {} from {}", record.field_id, record.tier);
    Ok(migrated)
}

fn failed(record: &Record, error: VaultError) -> RecordMigration {
    warn!("migration of {} failed: {error}", record.field_id);
    RecordMigration {
        record: record.clone(),
        outcome: MigrationOutcome::Failed(error),
    }
}
