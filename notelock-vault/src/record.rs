//! Stored records and their encryption tiers.

use crate::error::{VaultError, VaultResult};
use chrono::Utc;
use notelock_crypto::{
    CipherBlob, KdfParams, MasterKey, Salt, Zeroizing, decrypt_with_password,
    encrypt_with_password, field, master,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which derivation path produced a record's blob.
///
/// Ordered: records only ever move forward (`PasswordOnly` → `MasterWrapped`
/// → `FieldSpecific`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Sealed directly under a password-derived key.
    PasswordOnly,
    /// Sealed directly under the master key.
    MasterWrapped,
    /// Sealed under a per-field key derived from the master key.
    FieldSpecific,
}

impl Tier {
    /// The tier every record ends up in.
    pub const CURRENT: Tier = Tier::FieldSpecific;

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::PasswordOnly => "password-only",
            Tier::MasterWrapped => "master-wrapped",
            Tier::FieldSpecific => "field-specific",
        }
    }

    pub fn is_current(&self) -> bool {
        *self == Self::CURRENT
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One encrypted field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Owner identity; first half of the associated data.
    pub owner: String,
    /// Field name; second half of the associated data and the field-key context.
    pub field_id: String,
    pub tier: Tier,
    /// Blob token.
    pub blob: String,
    /// KDF parameters, present only for `password-only` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<KdfParams>,
    /// Field salt, present only for `field-specific` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_salt: Option<Salt>,
    /// Unix milliseconds of the last write.
    pub updated_at: i64,
}

impl Record {
    /// `"{owner}:{field_id}"`, authenticated with every seal of this field.
    pub fn associated_data(&self) -> Vec<u8> {
        associated_data(&self.owner, &self.field_id)
    }

    /// Seals `plaintext` under a password-derived key (legacy single-tier scheme).
    pub fn seal_password_only(
        owner: &str,
        field_id: &str,
        plaintext: &[u8],
        password: &str,
        params: &KdfParams,
    ) -> VaultResult<Self> {
        let aad = associated_data(owner, field_id);
        let blob = encrypt_with_password(plaintext, password, &aad, params)?;
        Ok(Self {
            owner: owner.to_string(),
            field_id: field_id.to_string(),
            tier: Tier::PasswordOnly,
            blob,
            kdf: Some(*params),
            field_salt: None,
            updated_at: Utc::now().timestamp_millis(),
        })
    }

    /// Seals `plaintext` directly under the master key.
    pub fn seal_master_wrapped(
        owner: &str,
        field_id: &str,
        plaintext: &[u8],
        master_key: &MasterKey,
    ) -> VaultResult<Self> {
        let aad = associated_data(owner, field_id);
        let blob = master::seal_with_master(master_key, plaintext, &aad)?;
        Ok(Self {
            owner: owner.to_string(),
            field_id: field_id.to_string(),
            tier: Tier::MasterWrapped,
            blob,
            kdf: None,
            field_salt: None,
            updated_at: Utc::now().timestamp_millis(),
        })
    }

    /// Seals `plaintext` under a freshly salted field key.
    pub fn seal_field_specific(
        owner: &str,
        field_id: &str,
        plaintext: &[u8],
        master_key: &MasterKey,
    ) -> VaultResult<Self> {
        let aad = associated_data(owner, field_id);
        let field_salt = Salt::random();
        let key = field::derive_field_key(master_key, &field_salt, field_id)?;
        let blob = key.seal(plaintext, &aad)?;
        Ok(Self {
            owner: owner.to_string(),
            field_id: field_id.to_string(),
            tier: Tier::FieldSpecific,
            blob,
            kdf: None,
            field_salt: Some(field_salt),
            updated_at: Utc::now().timestamp_millis(),
        })
    }

    fn inconsistent(&self, reason: impl Into<String>) -> VaultError {
        VaultError::InconsistentRecord {
            field_id: self.field_id.clone(),
            reason: reason.into(),
        }
    }

    /// Checks that the tier tag agrees with the metadata and blob the record
    /// carries, and returns the parsed blob.
    pub fn check_consistency(&self) -> VaultResult<CipherBlob> {
        let parsed = CipherBlob::decode(&self.blob)?;
        match self.tier {
            Tier::PasswordOnly => {
                if self.kdf.is_none() {
                    return Err(self.inconsistent("password-only record without kdf parameters"));
                }
                if self.field_salt.is_some() {
                    return Err(self.inconsistent("password-only record with a field salt"));
                }
            }
            Tier::MasterWrapped => {
                if self.kdf.is_some() || self.field_salt.is_some() {
                    return Err(self.inconsistent("master-wrapped record with derivation metadata"));
                }
            }
            Tier::FieldSpecific => {
                if self.kdf.is_some() {
                    return Err(self.inconsistent("field-specific record with kdf parameters"));
                }
                match self.field_salt {
                    Some(salt) if salt == parsed.salt => {}
                    Some(_) => return Err(self.inconsistent("field salt does not match blob salt")),
                    None => return Err(self.inconsistent("field-specific record without field salt")),
                }
            }
        }
        Ok(parsed)
    }

    /// Decrypts a `password-only` record.
    pub fn open_with_password(&self, password: &str) -> VaultResult<Zeroizing<Vec<u8>>> {
        self.check_consistency()?;
        let params = match (self.tier, self.kdf) {
            (Tier::PasswordOnly, Some(params)) => params,
            _ => return Err(self.inconsistent(format!("{} record needs the key hierarchy", self.tier))),
        };
        Ok(decrypt_with_password(
            &self.blob,
            password,
            &self.associated_data(),
            &params,
        )?)
    }

    /// Decrypts a `master-wrapped` or `field-specific` record.
    pub fn open_with_master(&self, master_key: &MasterKey) -> VaultResult<Zeroizing<Vec<u8>>> {
        let parsed = self.check_consistency()?;
        let aad = self.associated_data();
        match self.tier {
            Tier::PasswordOnly => Err(self.inconsistent("password-only record needs the password")),
            Tier::MasterWrapped => Ok(master::open_with_master(master_key, &self.blob, &aad)?),
            Tier::FieldSpecific => {
                let key = field::derive_field_key(master_key, &parsed.salt, &self.field_id)?;
                Ok(key.open(&parsed, &aad)?)
            }
        }
    }
}

/// Builds the associated-data string for a field.
pub fn associated_data(owner: &str, field_id: &str) -> Vec<u8> {
    format!("{owner}:{field_id}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_forward() {
        assert!(Tier::PasswordOnly < Tier::MasterWrapped);
        assert!(Tier::MasterWrapped < Tier::FieldSpecific);
        assert!(Tier::FieldSpecific.is_current());
    }

    #[test]
    fn tier_tags_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Tier::MasterWrapped).unwrap(),
            "\"master-wrapped\""
        );
        assert_eq!(Tier::PasswordOnly.to_string(), "password-only");
    }

    #[test]
    fn associated_data_format() {
        assert_eq!(associated_data("user1", "note"), b"user1:note".to_vec());
    }
}
