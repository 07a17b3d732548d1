use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

pub const RECENT_QUERIES_SLOT: &str = "recentQueries";
pub const MAX_RECENT_QUERIES: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage database: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("slot encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Named text slots in a local SQLite database.
pub struct SlotStore {
    conn: Connection,
}

impl SlotStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                name  TEXT PRIMARY KEY,
                value TEXT NOT NULL
             )",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, name: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO slots (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;
        Ok(())
    }
}

/// Up to five distinct queries, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentQueries {
    items: Vec<String>,
}

impl RecentQueries {
    pub fn from_items(items: Vec<String>) -> Self {
        let mut recent = Self::default();
        for item in items.into_iter().rev() {
            recent.record(&item);
        }
        recent
    }

    /// Reads the slot; a missing or unreadable value yields an empty list.
    pub fn load(store: &SlotStore) -> Self {
        let raw = match store.get(RECENT_QUERIES_SLOT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                log::warn!("could not read recent queries: {}", e);
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(items) => Self::from_items(items),
            Err(e) => {
                log::warn!("ignoring corrupt recent queries slot: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &SlotStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.items)?;
        store.put(RECENT_QUERIES_SLOT, &json)
    }

    /// Moves `query` to the front, dropping an exact duplicate and anything past five.
    pub fn record(&mut self, query: &str) {
        self.items.retain(|q| q != query);
        self.items.insert(0, query.to_string());
        self.items.truncate(MAX_RECENT_QUERIES);
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
