//! SQLite-backed episode store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{EpisodeFilter, EpisodeRecord, EpisodeStatus, EpisodeStore, NewEpisode, StoreError};

const COLUMNS: &str = "id, show_key, series_name, season, episode, title, status, source_url, \
     transfer_handle, created_at, updated_at, cleanup_pending, cleanup_attempts, \
     next_cleanup_at, last_error";

/// SQLite-backed episode store.
pub struct SqliteEpisodeStore {
    conn: Mutex<Connection>,
}

impl SqliteEpisodeStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                id TEXT PRIMARY KEY,
                show_key TEXT NOT NULL,
                series_name TEXT NOT NULL,
                season INTEGER NOT NULL,
                episode INTEGER NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                source_url TEXT NOT NULL,
                transfer_handle TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                cleanup_pending INTEGER NOT NULL DEFAULT 0,
                cleanup_attempts INTEGER NOT NULL DEFAULT 0,
                next_cleanup_at TEXT,
                last_error TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_episodes_identity
                ON episodes(show_key, season, episode);
            CREATE INDEX IF NOT EXISTS idx_episodes_status ON episodes(status);
            CREATE INDEX IF NOT EXISTS idx_episodes_handle ON episodes(transfer_handle);
            "#,
        )
        .map_err(db_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &EpisodeFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref show_key) = filter.show_key {
            conditions.push("show_key = ?");
            params.push(Box::new(show_key.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<EpisodeRecord> {
        let status_str: String = row.get(6)?;
        let status = status_str.parse::<EpisodeStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;
        let created_at: String = row.get(9)?;
        let updated_at: String = row.get(10)?;
        let next_cleanup_at: Option<String> = row.get(13)?;

        Ok(EpisodeRecord {
            id: row.get(0)?,
            show_key: row.get(1)?,
            series_name: row.get(2)?,
            season: row.get(3)?,
            episode: row.get(4)?,
            title: row.get(5)?,
            status,
            source_url: row.get(7)?,
            transfer_handle: row.get(8)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
            cleanup_pending: row.get(11)?,
            cleanup_attempts: row.get(12)?,
            next_cleanup_at: next_cleanup_at.as_deref().map(parse_timestamp),
            last_error: row.get(14)?,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<EpisodeRecord, StoreError> {
        conn.query_row(
            &format!("SELECT {} FROM episodes WHERE id = ?", COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

// Timestamps are written by this store, so a parse failure means a hand-edited row.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl EpisodeStore for SqliteEpisodeStore {
    fn create(&self, request: NewEpisode) -> Result<EpisodeRecord, StoreError> {
        let conn = self.lock()?;

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM episodes WHERE show_key = ? AND season = ? AND episode = ?)",
                params![request.show_key, request.season, request.episode],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if exists {
            return Err(StoreError::AlreadyTracked {
                show_key: request.show_key,
                season: request.season,
                episode: request.episode,
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let handle = request.transfer_handle.to_lowercase();

        conn.execute(
            &format!(
                "INSERT INTO episodes ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, NULL, NULL)",
                COLUMNS
            ),
            params![
                id,
                request.show_key,
                request.series_name,
                request.season,
                request.episode,
                request.title,
                EpisodeStatus::Incomplete.as_str(),
                request.source_url,
                handle,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Ok(EpisodeRecord {
            id,
            show_key: request.show_key,
            series_name: request.series_name,
            season: request.season,
            episode: request.episode,
            title: request.title,
            status: EpisodeStatus::Incomplete,
            source_url: request.source_url,
            transfer_handle: Some(handle),
            created_at: now,
            updated_at: now,
            cleanup_pending: false,
            cleanup_attempts: 0,
            next_cleanup_at: None,
            last_error: None,
        })
    }

    fn get(&self, id: &str) -> Result<Option<EpisodeRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM episodes WHERE id = ?", COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .optional()
        .map_err(db_err)
    }

    fn find(
        &self,
        show_key: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<EpisodeRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM episodes WHERE show_key = ? AND season = ? AND episode = ?",
                COLUMNS
            ),
            params![show_key, season, episode],
            Self::row_to_record,
        )
        .optional()
        .map_err(db_err)
    }

    fn max_season(&self, show_key: &str) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT MAX(season) FROM episodes WHERE show_key = ?",
            params![show_key],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    fn list(&self, filter: &EpisodeFilter) -> Result<Vec<EpisodeRecord>, StoreError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM episodes {} ORDER BY show_key ASC, season ASC, episode ASC LIMIT ? OFFSET ?",
            COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_record)
            .map_err(db_err)?;

        let records = rows.collect::<Result<Vec<_>, _>>().map_err(db_err)?;
        Ok(records)
    }

    fn count(&self, filter: &EpisodeFilter) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM episodes {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }

    fn active(&self) -> Result<Vec<EpisodeRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM episodes WHERE status IN ('incomplete', 'seeding') OR cleanup_pending = 1 \
                 ORDER BY created_at ASC",
                COLUMNS
            ))
            .map_err(db_err)?;
        let rows = stmt.query_map([], Self::row_to_record).map_err(db_err)?;
        let records = rows.collect::<Result<Vec<_>, _>>().map_err(db_err)?;
        Ok(records)
    }

    fn advance(&self, id: &str, to: EpisodeStatus) -> Result<EpisodeRecord, StoreError> {
        let conn = self.lock()?;
        let current = Self::fetch(&conn, id)?;

        if !current.status.can_advance_to(to) {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: current.status,
                to,
            });
        }

        let now = Utc::now();
        let cleanup_pending = to == EpisodeStatus::Complete;
        conn.execute(
            "UPDATE episodes SET status = ?, cleanup_pending = ?, updated_at = ? WHERE id = ? AND status = ?",
            params![
                to.as_str(),
                cleanup_pending,
                now.to_rfc3339(),
                id,
                current.status.as_str()
            ],
        )
        .map_err(db_err)?;

        Ok(EpisodeRecord {
            status: to,
            cleanup_pending,
            updated_at: now,
            ..current
        })
    }

    fn record_cleanup_failure(
        &self,
        id: &str,
        error: &str,
        retry_at: DateTime<Utc>,
    ) -> Result<EpisodeRecord, StoreError> {
        let conn = self.lock()?;
        let current = Self::fetch(&conn, id)?;

        let attempts = current.cleanup_attempts + 1;
        let now = Utc::now();
        conn.execute(
            "UPDATE episodes SET cleanup_attempts = ?, last_error = ?, next_cleanup_at = ?, updated_at = ? WHERE id = ?",
            params![attempts, error, retry_at.to_rfc3339(), now.to_rfc3339(), id],
        )
        .map_err(db_err)?;

        Ok(EpisodeRecord {
            cleanup_attempts: attempts,
            last_error: Some(error.to_string()),
            next_cleanup_at: Some(retry_at),
            updated_at: now,
            ..current
        })
    }

    fn clear_cleanup(&self, id: &str) -> Result<EpisodeRecord, StoreError> {
        let conn = self.lock()?;
        let current = Self::fetch(&conn, id)?;

        let now = Utc::now();
        conn.execute(
            "UPDATE episodes SET cleanup_pending = 0, next_cleanup_at = NULL, last_error = NULL, updated_at = ? WHERE id = ?",
            params![now.to_rfc3339(), id],
        )
        .map_err(db_err)?;

        Ok(EpisodeRecord {
            cleanup_pending: false,
            next_cleanup_at: None,
            last_error: None,
            updated_at: now,
            ..current
        })
    }

    fn delete(&self, id: &str) -> Result<EpisodeRecord, StoreError> {
        let conn = self.lock()?;
        let record = Self::fetch(&conn, id)?;
        conn.execute("DELETE FROM episodes WHERE id = ?", params![id])
            .map_err(db_err)?;
        Ok(record)
    }

    fn delete_show(&self, show_key: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM episodes WHERE show_key = ?", params![show_key])
            .map_err(db_err)
    }
}
