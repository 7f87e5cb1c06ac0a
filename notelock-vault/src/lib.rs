//! Tiered key hierarchy, record storage, migration and rotation.
//!
//! A [`NoteVault`] persists two kinds of values in a [`KeyValueStore`]:
//! the [`KeyHierarchy`] (keypair + wrapped master key) and one [`Record`]
//! per encrypted field. Nothing stored is raw key material.
//!
//! Records live in one of three [`Tier`]s and only move forward:
//!
//! ```text
//! password-only ──► master-wrapped ──► field-specific
//! ```
//!
//! [`MigrationEngine`] performs that move record by record; the functions
//! in [`rotation`] replace one layer of the hierarchy at a time. Both are
//! pure: they return new artifacts and leave persistence to the vault.

mod config;
mod error;
mod hierarchy;
pub mod migration;
mod record;
pub mod rotation;
mod store;
mod vault;
pub mod worker;

pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use hierarchy::{KeyHierarchy, UnlockedKeys};
pub use migration::{MigrationEngine, MigrationOutcome, MigrationReport, RecordMigration};
pub use record::{Record, Tier, associated_data};
pub use rotation::MasterRotation;
pub use store::{DuckDbStore, KeyValueStore, MemoryStore};
pub use vault::NoteVault;
