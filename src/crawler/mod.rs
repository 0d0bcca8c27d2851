//! Crawler module for page fetching and crawl execution
//!
//! This module contains the crawl machinery, including:
//! - HTTP fetching and charset decoding
//! - Concurrent broken-link probing
//! - Per-record crawl orchestration with a deadline and cancellation
//! - The bounded worker pool that accepts crawl submissions

mod decode;
mod fetcher;
mod orchestrator;
mod pool;
mod prober;

pub use decode::{decode_body, determine_encoding};
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage};
pub use orchestrator::{truncate_title, Orchestrator, MAX_TITLE_CHARS};
pub use pool::{CrawlJob, CrawlPool, PoolStats};
pub use prober::{LinkProber, BROKEN_THRESHOLD, PROBE_FAILURE_STATUS, SKIPPED_STATUS};

use crate::storage::StorageError;
use crate::UrlError;
use std::time::Duration;
use thiserror::Error;

/// Errors reported for a single crawl
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid crawl target: {0}")]
    InvalidTarget(#[from] UrlError),

    #[error("Crawl queue is full ({capacity} pending)")]
    Saturated { capacity: usize },

    #[error("Crawl pool is shut down")]
    PoolClosed,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Crawl exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),

    #[error("Crawl was cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Returns true for a probe status that marks a link as broken
pub fn is_broken(status: u16) -> bool {
    status >= BROKEN_THRESHOLD
}
