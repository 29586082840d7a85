//! SQLite-backed download record store.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};

use super::{DownloadRecord, DownloadState, DownloadStore, MediaKind, StoreError};

/// SQLite-backed download store.
///
/// The full record is stored as JSON alongside indexed filter columns, so the
/// schema survives record-shape evolution without migrations for every field.
pub struct SqliteDownloadStore {
    conn: Mutex<Connection>,
}

impl SqliteDownloadStore {
    /// Open (creating if needed) a store at the given path.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                id TEXT PRIMARY KEY,
                hash TEXT NOT NULL,
                state TEXT NOT NULL,
                series_id INTEGER,
                season INTEGER,
                episode INTEGER,
                movie_id INTEGER,
                auto_import INTEGER NOT NULL DEFAULT 0,
                imported_at TEXT,
                added_at TEXT NOT NULL,
                record TEXT NOT NULL
            );

            -- Rebuilt on open: the hash index must not be unique, a retry
            -- after a failed download reuses the hash of the Error record.
            DROP INDEX IF EXISTS idx_downloads_hash;
            CREATE INDEX idx_downloads_hash ON downloads(hash);
            CREATE INDEX IF NOT EXISTS idx_downloads_state ON downloads(state);
            CREATE INDEX IF NOT EXISTS idx_downloads_series
                ON downloads(series_id, season, episode);
            CREATE INDEX IF NOT EXISTS idx_downloads_movie ON downloads(movie_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<(String, String)> {
        let id: String = row.get(0)?;
        let json: String = row.get(1)?;
        Ok((id, json))
    }

    fn parse(id: String, json: String) -> Result<DownloadRecord, StoreError> {
        serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
            id,
            detail: e.to_string(),
        })
    }

    fn query_records(
        conn: &Connection,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<DownloadRecord>, StoreError> {
        let sql = format!(
            "SELECT id, record FROM downloads {} ORDER BY added_at DESC",
            where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params, Self::row_to_record)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, json) = row.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::parse(id, json)?);
        }
        Ok(records)
    }

    fn upsert(conn: &Connection, record: &DownloadRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record).map_err(|e| StoreError::Database(e.to_string()))?;
        let (series_id, season, episode, movie_id) = match &record.media {
            MediaKind::Episode {
                series_id,
                season,
                episode,
                ..
            } => (Some(*series_id), Some(*season), Some(*episode), None),
            MediaKind::Movie { movie_id, .. } => (None, None, None, Some(*movie_id)),
        };

        conn.execute(
            r#"
            INSERT INTO downloads
                (id, hash, state, series_id, season, episode, movie_id,
                 auto_import, imported_at, added_at, record)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                auto_import = excluded.auto_import,
                imported_at = excluded.imported_at,
                record = excluded.record
            "#,
            params![
                record.id,
                record.hash.to_lowercase(),
                record.state.as_str(),
                series_id,
                season,
                episode,
                movie_id,
                record.auto_import as i64,
                record.imported_at.map(|t| t.to_rfc3339()),
                record.added_at.to_rfc3339(),
                json,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl DownloadStore for SqliteDownloadStore {
    async fn create(&self, mut record: DownloadRecord) -> Result<DownloadRecord, StoreError> {
        if record.id.is_empty() {
            record.id = uuid::Uuid::new_v4().to_string();
            record.added_at = Utc::now();
        }
        let conn = self.conn.lock().unwrap();
        Self::upsert(&conn, &record)?;
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<DownloadRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let records = Self::query_records(&conn, "WHERE id = ?1", &[&id])?;
        Ok(records.into_iter().next())
    }

    async fn get_by_hash(&self, hash: &str) -> Result<Option<DownloadRecord>, StoreError> {
        let hash = hash.to_lowercase();
        let conn = self.conn.lock().unwrap();
        let records = Self::query_records(&conn, "WHERE hash = ?1", &[&hash])?;
        Ok(records.into_iter().next())
    }

    async fn list_all(&self) -> Result<Vec<DownloadRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_records(&conn, "", &[])
    }

    async fn list_by_state(&self, state: DownloadState) -> Result<Vec<DownloadRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_records(&conn, "WHERE state = ?1", &[&state.as_str()])
    }

    async fn list_active(&self) -> Result<Vec<DownloadRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_records(
            &conn,
            "WHERE state IN ('queued', 'downloading', 'paused', 'seeding')",
            &[],
        )
    }

    async fn find_episode(
        &self,
        series_id: i64,
        season: u32,
        episode: u32,
    ) -> Result<Vec<DownloadRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_records(
            &conn,
            "WHERE series_id = ?1 AND season = ?2 AND episode = ?3",
            &[&series_id, &season, &episode],
        )
    }

    async fn find_movie(&self, movie_id: i64) -> Result<Vec<DownloadRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_records(&conn, "WHERE movie_id = ?1", &[&movie_id])
    }

    async fn list_pending_import(&self) -> Result<Vec<DownloadRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_records(
            &conn,
            "WHERE state = 'completed' AND auto_import = 1 AND imported_at IS NULL",
            &[],
        )
    }

    async fn update(&self, record: DownloadRecord) -> Result<DownloadRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM downloads WHERE id = ?1",
                params![record.id],
                |row| row.get::<_, i64>(0).map(|n| n > 0),
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if !exists {
            return Err(StoreError::NotFound(record.id.clone()));
        }
        Self::upsert(&conn, &record)?;
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<DownloadRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        let records = Self::query_records(&conn, "WHERE id = ?1", &[&id])?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        conn.execute("DELETE FROM downloads WHERE id = ?1", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(record)
    }
}
