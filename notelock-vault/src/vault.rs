//! `NoteVault`: records and the key hierarchy over a [`KeyValueStore`].

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::hierarchy::KeyHierarchy;
use crate::migration::{MigrationEngine, MigrationOutcome, MigrationReport, RecordMigration};
use crate::record::{Record, Tier};
use crate::rotation;
use crate::store::KeyValueStore;
use notelock_crypto::{CryptoError, Zeroizing};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Encrypted field storage for one owner.
///
/// The vault keeps no key material between calls: every operation that needs
/// a key takes the password, unlocks what it needs and drops it on return.
pub struct NoteVault<S: KeyValueStore> {
    store: S,
    config: VaultConfig,
    owner: String,
}

fn entry<T: Serialize>(key: String, value: &T) -> VaultResult<(String, String)> {
    Ok((key, serde_json::to_string(value)?))
}

impl<S: KeyValueStore> NoteVault<S> {
    pub fn new(store: S, owner: impl Into<String>, config: VaultConfig) -> Self {
        Self {
            store,
            config,
            owner: owner.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // Key hierarchy
    // ========================================================================

    /// Whether a key hierarchy has been stored.
    pub fn is_initialized(&self) -> VaultResult<bool> {
        Ok(self.store.get(&self.config.hierarchy_key())?.is_some())
    }

    /// Creates the keypair and master key (first-time setup).
    pub fn initialize(&self, password: &str) -> VaultResult<()> {
        self.check_password_length(password)?;
        if self.is_initialized()? {
            return Err(VaultError::AlreadyInitialized);
        }

        let hierarchy = KeyHierarchy::bootstrap(password, &self.config.kdf)?;
        self.store.set(
            &self.config.hierarchy_key(),
            &serde_json::to_string(&hierarchy)?,
        )?;
        info!("initialized vault for {}", self.owner);
        Ok(())
    }

    /// The stored key hierarchy.
    pub fn hierarchy(&self) -> VaultResult<KeyHierarchy> {
        self.load_hierarchy()?.ok_or(VaultError::NotInitialized)
    }

    fn load_hierarchy(&self) -> VaultResult<Option<KeyHierarchy>> {
        match self.store.get(&self.config.hierarchy_key())? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn check_password_length(&self, password: &str) -> VaultResult<()> {
        let min = self.config.min_password_length;
        if password.chars().count() < min {
            return Err(VaultError::PasswordTooShort { min });
        }
        Ok(())
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Encrypts `plaintext` into a field-specific record and stores it,
    /// replacing any previous record for `field_id`.
    pub fn save(&self, field_id: &str, plaintext: &[u8], password: &str) -> VaultResult<Record> {
        let master_key = self.hierarchy()?.unlock_master(password)?;
        let record = Record::seal_field_specific(&self.owner, field_id, plaintext, &master_key)?;
        self.write_record(&record)?;
        debug!("saved {field_id} ({})", record.tier);
        Ok(record)
    }

    /// Stores `plaintext` in the password-only tier.
    ///
    /// Needs no key hierarchy. Records written this way stay readable but
    /// are picked up by the next [`migrate`](Self::migrate).
    pub fn save_legacy(
        &self,
        field_id: &str,
        plaintext: &[u8],
        password: &str,
    ) -> VaultResult<Record> {
        let record = Record::seal_password_only(
            &self.owner,
            field_id,
            plaintext,
            password,
            &self.config.kdf,
        )?;
        self.write_record(&record)?;
        debug!("saved {field_id} ({})", record.tier);
        Ok(record)
    }

    /// Decrypts the record stored for `field_id`, whatever its tier.
    pub fn read(&self, field_id: &str, password: &str) -> VaultResult<Zeroizing<Vec<u8>>> {
        let record = self.record(field_id)?;
        match record.tier {
            Tier::PasswordOnly => record.open_with_password(password),
            Tier::MasterWrapped | Tier::FieldSpecific => {
                let master_key = self.hierarchy()?.unlock_master(password)?;
                record.open_with_master(&master_key)
            }
        }
    }

    /// [`read`](Self::read) for text fields.
    pub fn read_string(&self, field_id: &str, password: &str) -> VaultResult<Zeroizing<String>> {
        let bytes = self.read(field_id, password)?;
        let text = std::str::from_utf8(&bytes).map_err(|e| {
            VaultError::Crypto(CryptoError::MalformedBlob(format!(
                "plaintext is not utf-8: {e}"
            )))
        })?;
        Ok(Zeroizing::new(text.to_owned()))
    }

    /// The stored record for `field_id`.
    ///
    /// Fails with `InconsistentRecord` if the stored record was sealed for a
    /// different field or owner.
    pub fn record(&self, field_id: &str) -> VaultResult<Record> {
        let json = self
            .store
            .get(&self.config.record_key(field_id))?
            .ok_or_else(|| VaultError::RecordNotFound(field_id.to_string()))?;
        self.parse_record(field_id, &json)
    }

    /// Every stored record, ordered by field id.
    pub fn records(&self) -> VaultResult<Vec<Record>> {
        self.load_all(&self.config.record_prefix())
    }

    /// Pre-migration copies kept by [`migrate`](Self::migrate).
    pub fn backups(&self) -> VaultResult<Vec<Record>> {
        self.load_all(&self.config.backup_prefix())
    }

    fn load_all(&self, prefix: &str) -> VaultResult<Vec<Record>> {
        let mut records = Vec::new();
        for (field_id, record) in self.load_slots(prefix)? {
            self.check_slot(&field_id, &record)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Every record under `prefix`, paired with the field id of its slot.
    fn load_slots(&self, prefix: &str) -> VaultResult<Vec<(String, Record)>> {
        let mut slots = Vec::new();
        for key in self.store.keys_with_prefix(prefix)? {
            if let Some(json) = self.store.get(&key)? {
                let field_id = key.strip_prefix(prefix).unwrap_or(key.as_str());
                slots.push((field_id.to_string(), serde_json::from_str(&json)?));
            }
        }
        Ok(slots)
    }

    fn parse_record(&self, field_id: &str, json: &str) -> VaultResult<Record> {
        let record: Record = serde_json::from_str(json)?;
        self.check_slot(field_id, &record)?;
        Ok(record)
    }

    /// The associated data is rebuilt from the record itself, so a record
    /// copied into another field's slot would still authenticate. The slot
    /// and the vault owner are checked against it here instead.
    fn check_slot(&self, field_id: &str, record: &Record) -> VaultResult<()> {
        let mismatch = |reason: String| VaultError::InconsistentRecord {
            field_id: field_id.to_string(),
            reason,
        };
        if record.field_id != field_id {
            return Err(mismatch(format!(
                "stored record belongs to field {}",
                record.field_id
            )));
        }
        if record.owner != self.owner {
            return Err(mismatch("stored record belongs to another owner".to_string()));
        }
        Ok(())
    }

    /// Removes a single record. Removing a missing record is not an error.
    pub fn delete(&self, field_id: &str) -> VaultResult<()> {
        self.store.delete(&self.config.record_key(field_id))
    }

    fn write_record(&self, record: &Record) -> VaultResult<()> {
        self.store.set(
            &self.config.record_key(&record.field_id),
            &serde_json::to_string(record)?,
        )
    }

    // ========================================================================
    // Migration
    // ========================================================================

    /// Moves every record to the field-specific tier.
    ///
    /// Creates the key hierarchy first if there is none yet. Each migrated
    /// record's previous version is written to a backup key in the same
    /// commit that overwrites it. Records that fail, including records found
    /// in another field's slot, are reported and left as they were.
    pub fn migrate(&self, password: &str) -> VaultResult<MigrationReport> {
        let mut records = Vec::new();
        let mut misplaced = Vec::new();
        for (field_id, record) in self.load_slots(&self.config.record_prefix())? {
            match self.check_slot(&field_id, &record) {
                Ok(()) => records.push(record),
                Err(e) => misplaced.push(RecordMigration {
                    record,
                    outcome: MigrationOutcome::Failed(e),
                }),
            }
        }
        let (hierarchy, created) = match self.load_hierarchy()? {
            Some(hierarchy) => (hierarchy, false),
            None => {
                self.check_password_length(password)?;
                (KeyHierarchy::bootstrap(password, &self.config.kdf)?, true)
            }
        };

        let mut report = MigrationEngine::new(&hierarchy).migrate_all(&records, password);

        let mut entries = Vec::new();
        if created && report.migrated_count() > 0 {
            entries.push(entry(self.config.hierarchy_key(), &hierarchy)?);
        }
        for (original, migrated) in records.iter().zip(&report.entries) {
            if let MigrationOutcome::Migrated { .. } = migrated.outcome {
                entries.push(entry(self.config.backup_key(&original.field_id), original)?);
                entries.push(entry(
                    self.config.record_key(&original.field_id),
                    &migrated.record,
                )?);
            }
        }

        if !entries.is_empty() {
            self.store.set_many(&entries)?;
        }
        report.entries.extend(misplaced);
        if report.failed_count() > 0 {
            warn!(
                "{} record(s) could not be migrated and were left unchanged",
                report.failed_count()
            );
        }
        Ok(report)
    }

    /// Deletes the backups written by [`migrate`](Self::migrate).
    ///
    /// Refused with `MigrationIncomplete` while any record is still in a
    /// legacy tier. Returns the number of backups removed.
    pub fn purge_legacy(&self) -> VaultResult<usize> {
        let remaining = self
            .records()?
            .iter()
            .filter(|r| !r.tier.is_current())
            .count();
        if remaining > 0 {
            return Err(VaultError::MigrationIncomplete { remaining });
        }

        let keys = self.store.keys_with_prefix(&self.config.backup_prefix())?;
        self.store.delete_many(&keys)?;
        info!("purged {} legacy backup(s)", keys.len());
        Ok(keys.len())
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    /// Changes the password protecting the private key.
    ///
    /// Password-only records are sealed directly under the old password and
    /// are not touched; migrate them first.
    pub fn rotate_password(&self, old_password: &str, new_password: &str) -> VaultResult<()> {
        self.check_password_length(new_password)?;
        let hierarchy = self.hierarchy()?;
        let rotated =
            rotation::rotate_password(&hierarchy, old_password, new_password, &self.config.kdf)?;

        let legacy = self
            .records()?
            .iter()
            .filter(|r| r.tier == Tier::PasswordOnly)
            .count();
        if legacy > 0 {
            warn!("{legacy} password-only record(s) still use the previous password");
        }

        self.store
            .set_many(&[entry(self.config.hierarchy_key(), &rotated)?])?;
        info!("rotated vault password");
        Ok(())
    }

    /// Replaces the keypair. The master key and all records are unchanged.
    pub fn rotate_asymmetric_keys(&self, password: &str) -> VaultResult<()> {
        let hierarchy = self.hierarchy()?;
        let rotated = rotation::rotate_asymmetric_keys(&hierarchy, password, &self.config.kdf)?;
        self.store
            .set_many(&[entry(self.config.hierarchy_key(), &rotated)?])?;
        Ok(())
    }

    /// Replaces the master key and re-encrypts every record that used it.
    ///
    /// The new wrapped master key and all re-encrypted records are written
    /// in a single commit.
    pub fn rotate_master_key(&self, password: &str) -> VaultResult<()> {
        let hierarchy = self.hierarchy()?;
        let keys = hierarchy.unlock(password)?;
        let records = self.records()?;

        let rotated = rotation::rotate_master_key(
            &keys.private_key,
            &hierarchy.keypair.public_key,
            &hierarchy.wrapped_master_key,
            &records,
        )?;

        let updated = KeyHierarchy {
            wrapped_master_key: rotated.wrapped_master_key,
            ..hierarchy
        };
        let mut entries = vec![entry(self.config.hierarchy_key(), &updated)?];
        for record in rotated.records.iter().filter(|r| r.tier.is_current()) {
            entries.push(entry(self.config.record_key(&record.field_id), record)?);
        }
        self.store.set_many(&entries)?;
        Ok(())
    }

    /// Re-keys one field with a fresh field salt.
    pub fn rotate_field_key(&self, field_id: &str, password: &str) -> VaultResult<Record> {
        let record = self.record(field_id)?;
        let master_key = self.hierarchy()?.unlock_master(password)?;
        let rotated = rotation::rotate_field_key(&master_key, &record)?;
        self.store
            .set_many(&[entry(self.config.record_key(field_id), &rotated)?])?;
        Ok(rotated)
    }

    /// Deletes every key this vault has written: records, backups and the
    /// key hierarchy.
    pub fn wipe(&self) -> VaultResult<()> {
        let prefix = format!("{}/", self.config.key_prefix);
        let keys = self.store.keys_with_prefix(&prefix)?;
        self.store.delete_many(&keys)?;
        info!("wiped vault for {} ({} keys)", self.owner, keys.len());
        Ok(())
    }
}
