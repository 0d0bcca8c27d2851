//! Statistics generation from the record database
//!
//! This module provides functionality for extracting and displaying
//! record counts from the storage layer.

use crate::state::CrawlStatus;
use crate::storage::{Storage, StorageResult};

/// Record counts per status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Total number of records
    pub total_records: usize,

    /// Count of records per status, in lifecycle order
    pub records_by_status: Vec<(CrawlStatus, usize)>,
}

impl CrawlStatistics {
    pub fn count(&self, status: CrawlStatus) -> usize {
        self.records_by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Share of finished records that ended in `done`, as a percentage
    pub fn success_rate(&self) -> f64 {
        let done = self.count(CrawlStatus::Done);
        let finished = done + self.count(CrawlStatus::Error);
        if finished == 0 {
            0.0
        } else {
            (done as f64 / finished as f64) * 100.0
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    let mut records_by_status = Vec::new();
    for status in CrawlStatus::all() {
        records_by_status.push((status, storage.count_by_status(status)?));
    }

    Ok(CrawlStatistics {
        total_records: records_by_status.iter().map(|(_, count)| count).sum(),
        records_by_status,
    })
}

/// Formats statistics for display
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::from("=== Crawl Statistics ===\n\n");

    out.push_str(&format!("Total records: {}\n\n", stats.total_records));
    out.push_str("Records by Status:\n");
    for (status, count) in &stats.records_by_status {
        let percentage = if stats.total_records > 0 {
            (*count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        out.push_str(&format!("  {:<8} {} ({:.1}%)\n", status, count, percentage));
    }
    out.push('\n');

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} finished crawls done)\n",
        stats.success_rate(),
        stats.count(CrawlStatus::Done),
        stats.count(CrawlStatus::Done) + stats.count(CrawlStatus::Error)
    ));

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
