//! Key-value persistence for token records.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// One persisted token record. `expiration` is a unix timestamp in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub token: String,
    pub expiration: Option<i64>,
}

/// Get-item / put-item storage keyed by a fixed logical id.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_item(&self, id: &str) -> Result<Option<StoredToken>>;

    /// Insert or overwrite the record stored under `id`.
    async fn put_item(&self, id: &str, item: StoredToken) -> Result<()>;
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    async fn get_item(&self, id: &str) -> Result<Option<StoredToken>> {
        (**self).get_item(id).await
    }

    async fn put_item(&self, id: &str, item: StoredToken) -> Result<()> {
        (**self).put_item(id, item).await
    }
}

/// SQLite-backed store, one table with `Id`, `Token`, `Expiration` columns.
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteTokenStore {
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        Self::with_connection(Connection::open(path)?, table)
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    /// Open `path` using the configured credentials table.
    pub fn from_config(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        Self::open(path, &config.credentials_table)
    }

    pub fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" \
                 (Id TEXT PRIMARY KEY, Token TEXT NOT NULL, Expiration INTEGER)"
            ),
            (),
        )?;
        debug!(table, "Token table ready");

        Ok(SqliteTokenStore {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get_item(&self, id: &str) -> Result<Option<StoredToken>> {
        let item = self
            .conn
            .lock()
            .await
            .query_row(
                &format!("SELECT Token, Expiration FROM \"{}\" WHERE Id = ?1", self.table),
                [id],
                |r| {
                    Ok(StoredToken {
                        token: r.get(0)?,
                        expiration: r.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(item)
    }

    async fn put_item(&self, id: &str, item: StoredToken) -> Result<()> {
        self.conn.lock().await.execute(
            &format!(
                "INSERT OR REPLACE INTO \"{}\" (Id, Token, Expiration) VALUES (?1, ?2, ?3)",
                self.table
            ),
            params![id, item.token, item.expiration],
        )?;

        Ok(())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    items: Mutex<HashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_item(&self, id: &str) -> Result<Option<StoredToken>> {
        Ok(self.items.lock().await.get(id).cloned())
    }

    async fn put_item(&self, id: &str, item: StoredToken) -> Result<()> {
        self.items.lock().await.insert(id.to_string(), item);
        Ok(())
    }
}

// The table name is spliced into SQL, so only plain identifiers are accepted.
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid credentials table name '{table}'")))
    }
}
