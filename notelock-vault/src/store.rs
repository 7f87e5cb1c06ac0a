//! Opaque key-value persistence.
//!
//! The vault only ever stores strings: JSON for records and the key
//! hierarchy, blob tokens inside them. Nothing written here is raw key
//! material.

use crate::error::{VaultError, VaultResult};
use chrono::Utc;
use duckdb::{Connection, params};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// String-keyed store the vault persists into.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> VaultResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> VaultResult<()>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> VaultResult<()>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>>;

    /// Writes several entries. Implementations that can should make this
    /// all-or-nothing; the default writes sequentially.
    fn set_many(&self, entries: &[(String, String)]) -> VaultResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Deletes several keys, with the same atomicity contract as
    /// [`set_many`](Self::set_many).
    fn delete_many(&self, keys: &[String]) -> VaultResult<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> VaultResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        (**self).delete(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>> {
        (**self).keys_with_prefix(prefix)
    }

    fn set_many(&self, entries: &[(String, String)]) -> VaultResult<()> {
        (**self).set_many(entries)
    }

    fn delete_many(&self, keys: &[String]) -> VaultResult<()> {
        (**self).delete_many(keys)
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-process store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> VaultResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| VaultError::Storage(e.to_string()))
    }

    /// Number of stored entries.
    pub fn len(&self) -> VaultResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> VaultResult<bool> {
        Ok(self.lock()?.is_empty())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> VaultResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>> {
        Ok(self
            .lock()?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn set_many(&self, entries: &[(String, String)]) -> VaultResult<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn delete_many(&self, keys: &[String]) -> VaultResult<()> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }
}

// ============================================================================
// DuckDbStore
// ============================================================================

/// DuckDB-backed store. Several namespaces can share one database file.
#[derive(Clone)]
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

/// Sanitize a namespace for use in SQL identifiers (table names).
/// Replaces any character that isn't alphanumeric or underscore with '_'.
fn sanitize_for_sql(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

impl DuckDbStore {
    /// Opens (or creates) the store at `path`.
    pub fn open(path: &Path, namespace: &str) -> VaultResult<Self> {
        let conn = Connection::open(path)?;
        // Cap memory/threads; DuckDB defaults to ~80% RAM per connection
        conn.execute_batch("PRAGMA memory_limit='64MB'; PRAGMA threads=1;")?;
        Self::with_connection(Arc::new(Mutex::new(conn)), namespace)
    }

    pub fn open_in_memory(namespace: &str) -> VaultResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(Arc::new(Mutex::new(conn)), namespace)
    }

    /// Uses an existing shared connection.
    pub fn with_connection(conn: Arc<Mutex<Connection>>, namespace: &str) -> VaultResult<Self> {
        let store = Self {
            conn,
            table: format!("notelock_{}_kv", sanitize_for_sql(namespace)),
        };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&self) -> VaultResult<()> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                key VARCHAR PRIMARY KEY,
                value VARCHAR NOT NULL,
                modified_at BIGINT NOT NULL
            );",
            self.table
        ))?;
        Ok(())
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT OR REPLACE INTO {} (key, value, modified_at) VALUES (?, ?, ?)",
            self.table
        )
    }
}

impl KeyValueStore for DuckDbStore {
    fn get(&self, key: &str) -> VaultResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let result = conn.query_row(
            &format!("SELECT value FROM {} WHERE key = ?", self.table),
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let now = Utc::now().timestamp_millis();
        conn.execute(&self.upsert_sql(), params![key, value, now])?;
        Ok(())
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute(
            &format!("DELETE FROM {} WHERE key = ?", self.table),
            params![key],
        )?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let mut stmt = conn.prepare(&format!(
            "SELECT key FROM {} WHERE starts_with(key, ?) ORDER BY key",
            self.table
        ))?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Writes all entries inside one transaction.
    fn set_many(&self, entries: &[(String, String)]) -> VaultResult<()> {
        let mut conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let now = Utc::now().timestamp_millis();
        let sql = self.upsert_sql();

        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(&sql, params![key, value, now])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Deletes all keys inside one transaction.
    fn delete_many(&self, keys: &[String]) -> VaultResult<()> {
        let mut conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let sql = format!("DELETE FROM {} WHERE key = ?", self.table);

        let tx = conn.transaction()?;
        for key in keys {
            tx.execute(&sql, params![key])?;
        }
        tx.commit()?;
        Ok(())
    }
}
