//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStatus`: the lifecycle of a crawl record (queued, running, done, error)

mod crawl_status;

pub use crawl_status::CrawlStatus;
