//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::CrawlStatus;
use crate::storage::{BrokenLinkRecord, CrawlRecord, HeadingRecord, RecordUpdate};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: CrawlStatus, to: CrawlStatus },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every method is one independent persistence operation. Status writes are
/// checked against [`CrawlStatus::can_transition_to`] before they happen.
pub trait Storage {
    // ===== Record lifecycle =====

    /// Creates a record for `url` in the `queued` status and returns its id
    fn create_record(&mut self, url: &str) -> StorageResult<i64>;

    /// Moves a record to a non-terminal status
    fn update_status(&mut self, id: i64, status: CrawlStatus) -> StorageResult<()>;

    /// Writes the crawl facts, sets `done` and stamps `last_crawled`
    fn complete_record(&mut self, id: i64, update: &RecordUpdate) -> StorageResult<()>;

    /// Sets `error` and stamps `last_crawled`
    fn fail_record(&mut self, id: i64) -> StorageResult<()>;

    // ===== Owned artifacts =====

    fn insert_heading(&mut self, id: i64, level: &str, count: u32) -> StorageResult<()>;

    fn insert_broken_link(&mut self, id: i64, link: &str, status: u16) -> StorageResult<()>;

    // ===== Queries =====

    fn get_record(&self, id: i64) -> StorageResult<Option<CrawlRecord>>;

    /// Returns up to `limit` records, newest first
    fn list_records(&self, limit: usize) -> StorageResult<Vec<CrawlRecord>>;

    /// Heading rows of a record, ordered h1..h6
    fn get_headings(&self, id: i64) -> StorageResult<Vec<HeadingRecord>>;

    /// Broken link rows of a record in insertion order
    fn get_broken_links(&self, id: i64) -> StorageResult<Vec<BrokenLinkRecord>>;

    fn count_by_status(&self, status: CrawlStatus) -> StorageResult<usize>;

    // ===== Deletion =====

    /// Deletes a record with its headings and broken links in one transaction
    ///
    /// An unknown id fails with [`StorageError::RecordNotFound`] and changes
    /// nothing.
    fn delete_record(&mut self, id: i64) -> StorageResult<()>;
}
