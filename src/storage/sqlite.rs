//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::CrawlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{BrokenLinkRecord, CrawlRecord, HeadingRecord, RecordUpdate};
use crate::SounderError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RECORD_COLUMNS: &str = "id, url, title, html_version, has_login, internal_links, \
     external_links, status, last_crawled, created_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SounderError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SounderError> {
        let conn = init_database(path)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, SounderError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn current_status(&self, id: i64) -> StorageResult<CrawlStatus> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM records WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let status = status.ok_or(StorageError::RecordNotFound(id))?;
        CrawlStatus::from_db_string(&status).ok_or_else(|| {
            StorageError::Database(format!("Unknown status {:?} on record {}", status, id))
        })
    }

    /// Fails unless `id` exists and may move to `next`
    fn check_transition(&self, id: i64, next: CrawlStatus) -> StorageResult<CrawlStatus> {
        let current = self.current_status(id)?;
        if !current.can_transition_to(next) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        Ok(current)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlRecord> {
    let status: String = row.get(7)?;
    Ok(CrawlRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        html_version: row.get(3)?,
        has_login: row.get(4)?,
        internal_links: row.get(5)?,
        external_links: row.get(6)?,
        status: CrawlStatus::from_db_string(&status).unwrap_or(CrawlStatus::Error),
        last_crawled: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Record lifecycle =====

    fn create_record(&mut self, url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO records (url, status, created_at) VALUES (?1, ?2, ?3)",
            params![url, CrawlStatus::Queued.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_status(&mut self, id: i64, status: CrawlStatus) -> StorageResult<()> {
        let current = self.check_transition(id, status)?;
        let last_crawled = status.is_terminal().then(|| Utc::now().to_rfc3339());

        // The status guard keeps a concurrent writer from skipping the check
        let changed = self.conn.execute(
            "UPDATE records SET status = ?1, last_crawled = COALESCE(?2, last_crawled)
             WHERE id = ?3 AND status = ?4",
            params![
                status.to_db_string(),
                last_crawled,
                id,
                current.to_db_string()
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::InvalidTransition {
                from: self.current_status(id)?,
                to: status,
            });
        }
        Ok(())
    }

    fn complete_record(&mut self, id: i64, update: &RecordUpdate) -> StorageResult<()> {
        let current = self.check_transition(id, CrawlStatus::Done)?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "UPDATE records SET title = ?1, html_version = ?2, has_login = ?3,
             internal_links = ?4, external_links = ?5, status = ?6, last_crawled = ?7
             WHERE id = ?8 AND status = ?9",
            params![
                update.title,
                update.html_version,
                update.has_login,
                update.internal_links,
                update.external_links,
                CrawlStatus::Done.to_db_string(),
                now,
                id,
                current.to_db_string()
            ],
        )?;
        Ok(())
    }

    fn fail_record(&mut self, id: i64) -> StorageResult<()> {
        self.update_status(id, CrawlStatus::Error)
    }

    // ===== Owned artifacts =====

    fn insert_heading(&mut self, id: i64, level: &str, count: u32) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO headings (record_id, level, count) VALUES (?1, ?2, ?3)",
            params![id, level, count],
        )?;
        Ok(())
    }

    fn insert_broken_link(&mut self, id: i64, link: &str, status: u16) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO broken_links (record_id, link, status) VALUES (?1, ?2, ?3)",
            params![id, link, status],
        )?;
        Ok(())
    }

    // ===== Queries =====

    fn get_record(&self, id: i64) -> StorageResult<Option<CrawlRecord>> {
        let query = format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS);
        let record = self
            .conn
            .query_row(&query, params![id], record_from_row)
            .optional()?;
        Ok(record)
    }

    fn list_records(&self, limit: usize) -> StorageResult<Vec<CrawlRecord>> {
        let query = format!(
            "SELECT {} FROM records ORDER BY id DESC LIMIT ?1",
            RECORD_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = self.conn.prepare(&query)?;
        let records = stmt
            .query_map(params![limit], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn get_headings(&self, id: i64) -> StorageResult<Vec<HeadingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, level, count FROM headings WHERE record_id = ?1 ORDER BY level",
        )?;

        let headings = stmt
            .query_map(params![id], |row| {
                Ok(HeadingRecord {
                    record_id: row.get(0)?,
                    level: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(headings)
    }

    fn get_broken_links(&self, id: i64) -> StorageResult<Vec<BrokenLinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, link, status FROM broken_links WHERE record_id = ?1 ORDER BY id",
        )?;

        let links = stmt
            .query_map(params![id], |row| {
                Ok(BrokenLinkRecord {
                    record_id: row.get(0)?,
                    link: row.get(1)?,
                    status: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    fn count_by_status(&self, status: CrawlStatus) -> StorageResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ===== Deletion =====

    fn delete_record(&mut self, id: i64) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM broken_links WHERE record_id = ?1", params![id])?;
        tx.execute("DELETE FROM headings WHERE record_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM records WHERE id = ?1", params![id])?;

        if deleted == 0 {
            // Dropping the transaction rolls it back
            return Err(StorageError::RecordNotFound(id));
        }

        tx.commit()?;
        Ok(())
    }
}

/// Initializes or opens a database at the given path
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Connection)` - Successfully opened/created database
/// * `Err(rusqlite::Error)` - Failed to open database
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}
