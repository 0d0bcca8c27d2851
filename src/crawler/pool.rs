//! Bounded crawl worker pool
//!
//! Submissions go through a bounded queue to a fixed set of worker tasks.
//! A submission that finds the queue full is rejected on the spot and leaves
//! no record behind.

use crate::config::CrawlerConfig;
use crate::crawler::orchestrator::Orchestrator;
use crate::crawler::CrawlError;
use crate::state::CrawlStatus;
use crate::storage::Storage;
use crate::url::validate_target;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One accepted crawl waiting for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub id: i64,
    pub target: Url,
}

/// Live counters of a pool
#[derive(Debug, Default)]
pub struct PoolStats {
    queued: AtomicUsize,
    in_flight: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl PoolStats {
    /// Jobs accepted but not yet picked up by a worker
    pub fn queue_depth(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Jobs a worker is currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Jobs that ended in `done`
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Jobs that ended in `error`, or whose final write failed
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Fixed-size pool of crawl workers fed by a bounded queue
pub struct CrawlPool<S> {
    sender: mpsc::Sender<CrawlJob>,
    orchestrator: Orchestrator<S>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<PoolStats>,
    cancel: CancellationToken,
    capacity: usize,
}

impl<S: Storage + Send + 'static> CrawlPool<S> {
    /// Spawns `workers` worker tasks behind a queue of `queue_capacity` slots
    ///
    /// Must be called from within a tokio runtime. Zero values are raised
    /// to 1.
    pub fn new(orchestrator: Orchestrator<S>, workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let capacity = queue_capacity.max(1);

        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let stats = Arc::new(PoolStats::default());
        let cancel = CancellationToken::new();

        let handles = (0..workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    receiver.clone(),
                    orchestrator.clone(),
                    stats.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::debug!("Started crawl pool: {} workers, queue of {}", workers, capacity);

        Self {
            sender,
            orchestrator,
            workers: handles,
            stats,
            cancel,
            capacity,
        }
    }

    /// Builds a pool sized by the crawler configuration
    pub fn from_config(config: &CrawlerConfig, orchestrator: Orchestrator<S>) -> Self {
        Self::new(orchestrator, config.workers, config.queue_capacity)
    }

    /// Validates `raw`, creates a `queued` record and hands it to a worker
    ///
    /// Returns the new record id without waiting for the crawl. Invalid
    /// targets and a full queue are rejected before any record exists.
    pub fn start_crawl(&self, raw: &str) -> Result<i64, CrawlError> {
        let target = validate_target(raw)?;

        let permit = self.sender.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => CrawlError::Saturated {
                capacity: self.capacity,
            },
            TrySendError::Closed(()) => CrawlError::PoolClosed,
        })?;

        let id = self.orchestrator.create_record(&target)?;
        self.stats.queued.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            "Queued crawl {} for {} ({} queued, {} in flight)",
            id,
            target,
            self.stats.queue_depth(),
            self.stats.in_flight()
        );
        permit.send(CrawlJob { id, target });

        Ok(id)
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        self.stats.clone()
    }

    pub fn queue_depth(&self) -> usize {
        self.stats.queue_depth()
    }

    pub fn in_flight(&self) -> usize {
        self.stats.in_flight()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Token that cancels every queued and running crawl of this pool
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops accepting work and waits until every accepted crawl has ended
    pub async fn shutdown(self) {
        let Self {
            sender, workers, ..
        } = self;
        drop(sender);

        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!("Crawl worker panicked: {}", e);
            }
        }
    }

    /// Cancels every accepted crawl, then shuts down
    ///
    /// Running crawls and crawls still in the queue all end in `error`.
    pub async fn abort(self) {
        self.cancel.cancel();
        self.shutdown().await;
    }
}

async fn worker_loop<S: Storage + Send + 'static>(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<CrawlJob>>>,
    orchestrator: Orchestrator<S>,
    stats: Arc<PoolStats>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };
        stats.queued.fetch_sub(1, Ordering::SeqCst);

        if cancel.is_cancelled() {
            if let Err(e) = orchestrator.fail_queued(job.id) {
                tracing::error!("Failed to cancel queued crawl {}: {}", job.id, e);
            }
            stats.failed.fetch_add(1, Ordering::SeqCst);
            continue;
        }

        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            "Worker {} took crawl {} ({} queued, {} in flight)",
            worker_id,
            job.id,
            stats.queue_depth(),
            stats.in_flight()
        );

        let result = orchestrator.run(&job, &cancel).await;
        stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(CrawlStatus::Done) => {
                stats.completed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(_) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                tracing::error!("Crawl {} could not be recorded: {}", job.id, e);
                stats.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    tracing::debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pool(workers: usize, capacity: usize) -> CrawlPool<SqliteStorage> {
        let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let orchestrator =
            Orchestrator::new(&CrawlerConfig::default(), reqwest::Client::new(), storage);
        CrawlPool::new(orchestrator, workers, capacity)
    }

    fn record_count(pool: &CrawlPool<SqliteStorage>) -> usize {
        pool.orchestrator
            .storage()
            .lock()
            .unwrap()
            .list_records(100)
            .unwrap()
            .len()
    }

    fn status_of(pool: &CrawlPool<SqliteStorage>, id: i64) -> CrawlStatus {
        pool.orchestrator
            .storage()
            .lock()
            .unwrap()
            .get_record(id)
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_invalid_target_creates_no_record() {
        let pool = pool(1, 4);

        for raw in ["not a url", "/relative/path", "http://", ""] {
            let err = pool.start_crawl(raw).unwrap_err();
            assert!(matches!(err, CrawlError::InvalidTarget(_)), "{}", raw);
        }

        assert_eq!(record_count(&pool), 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_saturated_queue_rejects_without_record() {
        // On the current-thread runtime no worker runs before the next await
        let pool = pool(1, 1);

        let first = pool.start_crawl("http://127.0.0.1:9/a").unwrap();
        let err = pool.start_crawl("http://127.0.0.1:9/b").unwrap_err();

        assert!(matches!(err, CrawlError::Saturated { capacity: 1 }));
        assert_eq!(pool.queue_depth(), 1);
        assert_eq!(record_count(&pool), 1);
        assert_eq!(status_of(&pool, first), CrawlStatus::Queued);

        pool.abort().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<title>ok</title>"))
            .mount(&server)
            .await;

        let pool = pool(2, 8);
        let stats = pool.stats();
        let ids: Vec<_> = (0..4)
            .map(|i| pool.start_crawl(&format!("{}/p{}", server.uri(), i)).unwrap())
            .collect();
        assert_eq!(pool.queue_depth(), 4);

        let orchestrator = pool.orchestrator.clone();
        pool.shutdown().await;

        assert_eq!(stats.completed(), 4);
        assert_eq!(stats.queue_depth(), 0);
        assert_eq!(stats.in_flight(), 0);
        let storage = orchestrator.storage().lock().unwrap();
        for id in ids {
            assert_eq!(
                storage.get_record(id).unwrap().unwrap().status,
                CrawlStatus::Done
            );
        }
    }

    #[tokio::test]
    async fn test_abort_cancels_running_and_queued() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let pool = pool(1, 4);
        let stats = pool.stats();
        let running = pool.start_crawl(&server.uri()).unwrap();
        let waiting = pool.start_crawl(&server.uri()).unwrap();

        // Let the worker pick up the first job
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.in_flight(), 1);

        let orchestrator = pool.orchestrator.clone();
        pool.abort().await;

        assert_eq!(stats.failed(), 2);
        let storage = orchestrator.storage().lock().unwrap();
        for id in [running, waiting] {
            assert_eq!(
                storage.get_record(id).unwrap().unwrap().status,
                CrawlStatus::Error
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_counts_as_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let pool = pool(1, 2);
        let stats = pool.stats();
        let id = pool.start_crawl(&server.uri()).unwrap();
        let orchestrator = pool.orchestrator.clone();
        pool.shutdown().await;

        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.completed(), 0);
        let record = orchestrator
            .storage()
            .lock()
            .unwrap()
            .get_record(id)
            .unwrap()
            .unwrap();
        assert_eq!(record.status, CrawlStatus::Error);
    }
}
