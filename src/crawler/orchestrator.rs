//! Crawl orchestration
//!
//! The orchestrator drives one crawl record through its lifecycle:
//! `queued -> running -> done | error`. It owns no storage of its own; the
//! storage handle is injected by the caller and locked only around
//! individual synchronous writes, never across an `.await`.

use crate::analysis::{analyze, detect_html_version, HtmlVersion, PageAnalysis};
use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::pool::CrawlJob;
use crate::crawler::prober::LinkProber;
use crate::crawler::CrawlError;
use crate::state::CrawlStatus;
use crate::storage::{RecordUpdate, Storage, StorageError, StorageResult};
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Longest title stored on a record, in characters
pub const MAX_TITLE_CHARS: usize = 255;

/// Truncates a title to at most [`MAX_TITLE_CHARS`] characters
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
pub fn truncate_title(title: &str) -> String {
    match title.char_indices().nth(MAX_TITLE_CHARS) {
        Some((cut, _)) => title[..cut].to_string(),
        None => title.to_string(),
    }
}

/// Runs crawls against an injected storage backend
pub struct Orchestrator<S> {
    storage: Arc<Mutex<S>>,
    client: Client,
    prober: LinkProber,
    crawl_timeout: Duration,
}

impl<S> Clone for Orchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            client: self.client.clone(),
            prober: self.prober.clone(),
            crawl_timeout: self.crawl_timeout,
        }
    }
}

impl<S: Storage + Send + 'static> Orchestrator<S> {
    /// Creates an orchestrator sharing `client` for the page fetch and the
    /// link probes
    pub fn new(config: &CrawlerConfig, client: Client, storage: Arc<Mutex<S>>) -> Self {
        let prober = LinkProber::new(
            client.clone(),
            Duration::from_millis(config.probe_timeout_ms),
            config.probe_concurrency,
        );

        Self {
            storage,
            client,
            prober,
            crawl_timeout: Duration::from_secs(config.crawl_timeout_secs),
        }
    }

    /// Overrides the per-crawl deadline
    pub fn with_crawl_timeout(mut self, timeout: Duration) -> Self {
        self.crawl_timeout = timeout;
        self
    }

    pub fn crawl_timeout(&self) -> Duration {
        self.crawl_timeout
    }

    pub fn storage(&self) -> &Arc<Mutex<S>> {
        &self.storage
    }

    fn with_storage<T>(&self, op: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        let mut storage = self.storage.lock().map_err(|_| StorageError::LockPoisoned)?;
        op(&mut storage)
    }

    /// Creates the `queued` record for a validated target
    pub fn create_record(&self, target: &Url) -> Result<i64, CrawlError> {
        Ok(self.with_storage(|s| s.create_record(target.as_str()))?)
    }

    /// Ends a crawl that was cancelled before any worker started it
    pub fn fail_queued(&self, id: i64) -> Result<(), CrawlError> {
        tracing::info!("Crawl {} cancelled before it started", id);
        Ok(self.with_storage(|s| s.fail_record(id))?)
    }

    /// Runs one crawl to a terminal status
    ///
    /// Fetch, decode, deadline and cancellation failures end the record in
    /// `error` and are reported through the returned status. An `Err` means a
    /// status transition itself could not be persisted.
    pub async fn run(
        &self,
        job: &CrawlJob,
        cancel: &CancellationToken,
    ) -> Result<CrawlStatus, CrawlError> {
        self.with_storage(|s| s.update_status(job.id, CrawlStatus::Running))
            .map_err(|e| {
                tracing::error!("Failed to start crawl {}: {}", job.id, e);
                e
            })?;

        tracing::info!("Crawling {} (record {})", job.target, job.id);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CrawlError::Cancelled),
            result = tokio::time::timeout(
                self.crawl_timeout,
                self.fetch_and_analyze(&job.target),
            ) => {
                match result {
                    Ok(Ok(analyzed)) => Ok(analyzed),
                    Ok(Err(e)) => Err(CrawlError::Fetch(e)),
                    Err(_) => Err(CrawlError::DeadlineExceeded(self.crawl_timeout)),
                }
            }
        };

        match outcome {
            Ok((version, analysis)) => {
                self.persist_success(job.id, version, &analysis)?;
                tracing::info!(
                    "Crawl {} done: {} internal, {} external, {} broken",
                    job.id,
                    analysis.internal_links,
                    analysis.external_links,
                    analysis.broken_links.len()
                );
                Ok(CrawlStatus::Done)
            }
            Err(e) => {
                tracing::warn!("Crawl {} of {} failed: {}", job.id, job.target, e);
                self.with_storage(|s| s.fail_record(job.id)).map_err(|e| {
                    tracing::error!("Failed to mark crawl {} as error: {}", job.id, e);
                    e
                })?;
                Ok(CrawlStatus::Error)
            }
        }
    }

    async fn fetch_and_analyze(
        &self,
        target: &Url,
    ) -> Result<(HtmlVersion, PageAnalysis), FetchError> {
        let page = fetch_page(&self.client, target).await?;
        let version = detect_html_version(&page.body);

        // Links resolve against the submitted target, not the redirect target
        let analysis = analyze(&page.body, target, &self.prober).await;

        Ok((version, analysis))
    }

    /// Writes the record facts, then each heading and broken link on its own
    fn persist_success(
        &self,
        id: i64,
        version: HtmlVersion,
        analysis: &PageAnalysis,
    ) -> Result<(), CrawlError> {
        let update = RecordUpdate {
            title: truncate_title(&analysis.title),
            html_version: version.label().to_string(),
            has_login: analysis.has_login,
            internal_links: analysis.internal_links,
            external_links: analysis.external_links,
        };

        self.with_storage(|s| s.complete_record(id, &update))
            .map_err(|e| {
                tracing::error!("Failed to complete crawl {}: {}", id, e);
                e
            })?;

        for (level, count) in &analysis.headings {
            if let Err(e) = self.with_storage(|s| s.insert_heading(id, level.as_str(), *count)) {
                tracing::warn!("Skipping {} count for record {}: {}", level, id, e);
            }
        }

        for link in &analysis.broken_links {
            let inserted = self.with_storage(|s| s.insert_broken_link(id, &link.url, link.status));
            if let Err(e) = inserted {
                tracing::warn!("Skipping broken link {} for record {}: {}", link.url, id, e);
            }
        }

        Ok(())
    }
}
