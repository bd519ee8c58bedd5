use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::info;

use crate::domain::MdvError;
use crate::visibility::VisibilityStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS column_visibility_settings (
    role TEXT NOT NULL,
    tab TEXT NOT NULL,
    hidden_columns TEXT NOT NULL,
    PRIMARY KEY (role, tab)
);
CREATE TABLE IF NOT EXISTS tab_visibility_settings (
    role TEXT NOT NULL PRIMARY KEY,
    hidden_tabs TEXT NOT NULL
);
";

/// SQLite backed visibility settings, one rule row per (role, tab) for
/// columns and per role for tabs. Hidden sets are stored as JSON arrays.
pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    pub fn open(path: &Path) -> Result<Self, MdvError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("Opened settings store at {}", path.display());
        Ok(Self { conn })
    }

    /// Store with no backing file; starts without rules, so everything
    /// resolves visible.
    pub fn in_memory() -> Result<Self, MdvError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Replaces the column rule for (role, tab). Upsert is delete-then-insert
    /// so a repeated save never leaves two rows for one key.
    pub fn set_hidden_columns(
        &mut self,
        role: &str,
        tab: &str,
        hidden: &[String],
    ) -> Result<(), MdvError> {
        let encoded = serde_json::to_string(hidden)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM column_visibility_settings WHERE role = ?1 AND tab = ?2",
            params![role, tab],
        )?;
        tx.execute(
            "INSERT INTO column_visibility_settings (role, tab, hidden_columns) VALUES (?1, ?2, ?3)",
            params![role, tab, encoded],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn set_hidden_tabs(&mut self, role: &str, hidden: &[String]) -> Result<(), MdvError> {
        let encoded = serde_json::to_string(hidden)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM tab_visibility_settings WHERE role = ?1",
            params![role],
        )?;
        tx.execute(
            "INSERT INTO tab_visibility_settings (role, hidden_tabs) VALUES (?1, ?2)",
            params![role, encoded],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl VisibilityStore for SettingsStore {
    fn hidden_columns(&self, role: &str, tab: &str) -> Result<Option<Vec<String>>, MdvError> {
        let encoded: Option<String> = self
            .conn
            .query_row(
                "SELECT hidden_columns FROM column_visibility_settings WHERE role = ?1 AND tab = ?2",
                params![role, tab],
                |row| row.get(0),
            )
            .optional()?;
        encoded
            .map(|raw| serde_json::from_str(&raw).map_err(MdvError::from))
            .transpose()
    }

    fn hidden_tabs(&self, role: &str) -> Result<Option<Vec<String>>, MdvError> {
        let encoded: Option<String> = self
            .conn
            .query_row(
                "SELECT hidden_tabs FROM tab_visibility_settings WHERE role = ?1",
                params![role],
                |row| row.get(0),
            )
            .optional()?;
        encoded
            .map(|raw| serde_json::from_str(&raw).map_err(MdvError::from))
            .transpose()
    }
}
