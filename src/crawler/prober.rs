//! Broken-link prober
//!
//! Every resolved link of a page is checked with a HEAD request. Probes run
//! concurrently up to a fixed bound and are joined before the page analysis
//! is handed back, so a crawl never finishes with probes still in flight.

use crate::analysis::BrokenLink;
use crate::crawler::is_broken;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Status recorded when a probe gets no response at all
pub const PROBE_FAILURE_STATUS: u16 = 500;

/// Status reported for links that are not probed over HTTP
pub const SKIPPED_STATUS: u16 = 200;

/// Lowest status counted as broken
pub const BROKEN_THRESHOLD: u16 = 400;

/// Checks links with bounded concurrency
#[derive(Debug, Clone)]
pub struct LinkProber {
    client: Client,
    timeout: Duration,
    concurrency: usize,
}

impl LinkProber {
    /// Creates a prober sharing `client`, with a per-probe `timeout` and at
    /// most `concurrency` probes in flight (a bound of 0 is treated as 1)
    pub fn new(client: Client, timeout: Duration, concurrency: usize) -> Self {
        Self {
            client,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probes one link and returns the observed status
    ///
    /// Links whose scheme is not `http` or `https` are not requested and
    /// report 200. Transport failures of any kind, timeouts included,
    /// report 500.
    pub async fn probe(&self, link: &Url) -> u16 {
        probe_with(&self.client, self.timeout, link).await
    }

    /// Probes every link and returns the broken ones in input order
    ///
    /// Duplicates are probed and reported once per occurrence.
    pub async fn find_broken(&self, links: Vec<Url>) -> Vec<BrokenLink> {
        if links.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, link) in links.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let timeout = self.timeout;

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let status = probe_with(&client, timeout, &link).await;
                (index, link, status)
            });
        }

        let mut broken = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, link, status)) if is_broken(status) => {
                    tracing::debug!("Broken link {} (HTTP {})", link, status);
                    broken.push((
                        index,
                        BrokenLink {
                            url: link.to_string(),
                            status,
                        },
                    ));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Link probe task failed: {}", e),
            }
        }

        broken.sort_by_key(|(index, _)| *index);
        broken.into_iter().map(|(_, link)| link).collect()
    }
}

async fn probe_with(client: &Client, timeout: Duration, link: &Url) -> u16 {
    if !matches!(link.scheme(), "http" | "https") {
        return SKIPPED_STATUS;
    }

    match client.head(link.clone()).timeout(timeout).send().await {
        Ok(response) => response.status().as_u16(),
        Err(e) => {
            tracing::debug!("Probe of {} failed: {}", link, e);
            PROBE_FAILURE_STATUS
        }
    }
}
