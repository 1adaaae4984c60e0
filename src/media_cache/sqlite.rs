//! SQLite implementation of the ContentStore trait

use crate::media_cache::{ContentStore, VaultError, VideoMeta};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// SQLite-backed implementation of ContentStore
///
/// Video bytes live in a BLOB column keyed by the derived identity. The
/// connection mutex is held across the existence check and the insert in
/// `put`, which serializes concurrent puts for the same id.
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    /// Open a content store at the given path
    ///
    /// If the database doesn't exist, it will be created with the required schema.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, VaultError> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), VaultError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                name TEXT NOT NULL,
                size INTEGER NOT NULL,
                last_modified INTEGER NOT NULL,
                stored_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        info!("Video content store schema initialized");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentStore for SqliteContentStore {
    async fn has(&self, id: &str) -> Result<bool, VaultError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT 1 FROM videos WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;

        Ok(rows.next().is_some())
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, VaultError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT data FROM videos WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| row.get::<_, Vec<u8>>(0))?;

        match rows.next() {
            Some(Ok(data)) => Ok(data),
            Some(Err(e)) => Err(VaultError::Database(e.to_string())),
            None => Err(VaultError::NotFound(id.to_string())),
        }
    }

    async fn put(&self, id: &str, data: &[u8], meta: &VideoMeta) -> Result<(), VaultError> {
        let conn = self.conn.lock().unwrap();

        // Check first so a re-store of an existing id never rewrites the blob.
        let exists = {
            let mut stmt = conn.prepare("SELECT 1 FROM videos WHERE id = ?1")?;
            let mut rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;
            rows.next().is_some()
        };

        if exists {
            debug!("♻️  Video already stored: {}", meta.name);
            return Ok(());
        }

        conn.execute(
            r#"
            INSERT OR IGNORE INTO videos (id, data, name, size, last_modified)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, data, meta.name, meta.size as i64, meta.last_modified],
        )?;

        debug!("💾 Stored video: {} ({} bytes)", meta.name, data.len());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, VaultError> {
        let conn = self.conn.lock().unwrap();

        let removed = conn.execute("DELETE FROM videos WHERE id = ?1", params![id])?;

        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<(), VaultError> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM videos", [])?;

        info!("Cleared all stored videos");
        Ok(())
    }

    async fn usage(&self) -> Result<u64, VaultError> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(data)), 0) FROM videos",
            [],
            |row| row.get(0),
        )?;

        Ok(total as u64)
    }
}
