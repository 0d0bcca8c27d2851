//! Storage module for persisting crawl records
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Crawl record lifecycle (status transitions checked before every write)
//! - Heading count and broken link rows owned by a record
//! - Cascading deletion of a record and everything it owns

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{init_database, SqliteStorage};
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::CrawlStatus;
use crate::SounderError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SounderError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SounderError> {
    SqliteStorage::new(path)
}

/// A crawl record as stored in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub html_version: String,
    pub has_login: bool,
    pub internal_links: u32,
    pub external_links: u32,
    pub status: CrawlStatus,
    pub last_crawled: Option<String>,
    pub created_at: String,
}

/// Facts written to a record when its crawl finishes successfully
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub title: String,
    pub html_version: String,
    pub has_login: bool,
    pub internal_links: u32,
    pub external_links: u32,
}

/// Heading count row owned by a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRecord {
    pub record_id: i64,
    pub level: String,
    pub count: u32,
}

/// Broken link row owned by a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkRecord {
    pub record_id: i64,
    pub link: String,
    pub status: u16,
}
