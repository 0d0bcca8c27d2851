//! Output module for presenting stored crawl records
//!
//! This module handles:
//! - Tabular listings of records
//! - Markdown detail reports of a single record
//! - Record statistics per status

mod report;
pub mod stats;

pub use report::{format_record_detail, format_record_table, RecordReport};
pub use stats::{format_statistics, load_statistics, print_statistics, CrawlStatistics};

use crate::storage::{Storage, StorageResult};

/// Loads a record with its headings and broken links
///
/// Returns `Ok(None)` when no record has this id.
pub fn load_record_report(storage: &dyn Storage, id: i64) -> StorageResult<Option<RecordReport>> {
    let Some(record) = storage.get_record(id)? else {
        return Ok(None);
    };

    Ok(Some(RecordReport {
        headings: storage.get_headings(id)?,
        broken_links: storage.get_broken_links(id)?,
        record,
    }))
}
