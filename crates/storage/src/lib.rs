mod session;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};

pub use session::{session_ttl, SessionStore, SESSION_KEY, SESSION_TTL_MILLIS};

/// String key/value storage in the shape of browser local storage.
pub trait KeyValueStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let storage = Self { pool };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
              value=excluded.value,
              updated_at=excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub enum Storage {
    Memory(MemoryStorage),
    Sqlite(SqliteStorage),
}

impl Storage {
    pub fn memory() -> Self {
        Self::Memory(MemoryStorage::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStorage::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Storage::Memory(_) => "memory",
            Storage::Sqlite(_) => "sqlite",
        }
    }
}

impl KeyValueStorage for Storage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self {
            Storage::Memory(storage) => storage.get_item(key).await,
            Storage::Sqlite(storage) => storage.get_item(key).await,
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Storage::Memory(storage) => storage.set_item(key, value).await,
            Storage::Sqlite(storage) => storage.set_item(key, value).await,
        }
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        match self {
            Storage::Memory(storage) => storage.remove_item(key).await,
            Storage::Sqlite(storage) => storage.remove_item(key).await,
        }
    }
}

impl<T: KeyValueStorage> KeyValueStorage for Arc<T> {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.as_ref().get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.as_ref().set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.as_ref().remove_item(key).await
    }
}
