//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full submit, crawl and persist cycle end-to-end.

use page_sounder::config::{Config, CrawlerConfig, StorageConfig, UserAgentConfig};
use page_sounder::crawler::{build_http_client, CrawlError, CrawlPool, Orchestrator};
use page_sounder::state::CrawlStatus;
use page_sounder::storage::{CrawlRecord, SqliteStorage, Storage, StorageError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to a database inside `dir`
fn create_test_config(dir: &TempDir) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 2,
            queue_capacity: 16,
            probe_concurrency: 4,
            probe_timeout_ms: 2000,
            crawl_timeout_secs: 10,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            database_path: dir
                .path()
                .join("sounder.db")
                .to_string_lossy()
                .into_owned(),
        },
    }
}

fn open_storage(config: &Config) -> Arc<Mutex<SqliteStorage>> {
    let storage = SqliteStorage::new(std::path::Path::new(&config.storage.database_path))
        .expect("Failed to open storage");
    Arc::new(Mutex::new(storage))
}

fn create_pool(
    config: &Config,
    storage: Arc<Mutex<SqliteStorage>>,
) -> CrawlPool<SqliteStorage> {
    let client = build_http_client(&config.user_agent).expect("Failed to build client");
    let orchestrator = Orchestrator::new(&config.crawler, client, storage);
    CrawlPool::from_config(&config.crawler, orchestrator)
}

/// Submits every target, waits for the pool to drain and returns the
/// submission results in order
async fn crawl_all(
    config: &Config,
    storage: Arc<Mutex<SqliteStorage>>,
    targets: &[String],
) -> Vec<Result<i64, CrawlError>> {
    let pool = create_pool(config, storage);
    let results = targets.iter().map(|t| pool.start_crawl(t)).collect();
    pool.shutdown().await;
    results
}

fn get_record(storage: &Arc<Mutex<SqliteStorage>>, id: i64) -> CrawlRecord {
    storage
        .lock()
        .unwrap()
        .get_record(id)
        .unwrap()
        .expect("Record should exist")
}

#[tokio::test]
async fn test_crawl_records_page_facts() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(
                    r#"<!DOCTYPE html>
<html><head><title>Example Page</title></head>
<body>
  <h1>Main</h1>
  <h2>First</h2>
  <h2>Second</h2>
  <a href="/about">About</a>
  <a href="missing">Missing</a>
  <a href="http://127.0.0.1:9/down">Down</a>
  <a href="mailto:team@example.com">Mail</a>
  <form><input type="text"><input type="password"></form>
</body></html>"#,
                )
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    // Any other HEAD to the mock server falls through to wiremock's 404

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let results = crawl_all(&config, storage.clone(), &[format!("{}/page", base_url)]).await;
    let id = *results[0].as_ref().expect("Crawl should be accepted");

    let record = get_record(&storage, id);
    assert_eq!(record.status, CrawlStatus::Done);
    assert_eq!(record.title, "Example Page");
    assert_eq!(record.html_version, "HTML5");
    assert!(record.has_login);
    assert_eq!(record.internal_links, 2);
    assert_eq!(record.external_links, 2);
    assert!(record.last_crawled.is_some());

    let storage = storage.lock().unwrap();
    let headings: Vec<_> = storage
        .get_headings(id)
        .unwrap()
        .into_iter()
        .map(|h| (h.level, h.count))
        .collect();
    assert_eq!(
        headings,
        vec![("h1".to_string(), 1), ("h2".to_string(), 2)]
    );

    let broken: Vec<_> = storage
        .get_broken_links(id)
        .unwrap()
        .into_iter()
        .map(|b| (b.link, b.status))
        .collect();
    assert_eq!(
        broken,
        vec![
            (format!("{}/missing", base_url), 404),
            ("http://127.0.0.1:9/down".to_string(), 500),
        ]
    );
}

#[tokio::test]
async fn test_page_without_login_or_doctype() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN"><html><body><p>plain</p></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let results = crawl_all(&config, storage.clone(), &[mock_server.uri()]).await;
    let record = get_record(&storage, *results[0].as_ref().unwrap());

    assert_eq!(record.status, CrawlStatus::Done);
    assert_eq!(record.html_version, "HTML 4.01");
    assert!(!record.has_login);
    assert_eq!(record.title, "");
    assert_eq!(record.internal_links, 0);
    assert_eq!(record.external_links, 0);
}

#[tokio::test]
async fn test_http_error_marks_record_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("<title>Not Found</title><h1>404</h1>"),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let results = crawl_all(&config, storage.clone(), &[format!("{}/gone", mock_server.uri())]).await;
    let id = *results[0].as_ref().unwrap();

    let record = get_record(&storage, id);
    assert_eq!(record.status, CrawlStatus::Error);
    assert!(record.last_crawled.is_some());
    assert_eq!(record.title, "");
    assert_eq!(record.html_version, "");
    assert_eq!(record.internal_links, 0);

    let storage = storage.lock().unwrap();
    assert!(storage.get_headings(id).unwrap().is_empty());
    assert!(storage.get_broken_links(id).unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_target_marks_record_error() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let results = crawl_all(&config, storage.clone(), &["http://127.0.0.1:9/".to_string()]).await;
    let record = get_record(&storage, *results[0].as_ref().unwrap());

    assert_eq!(record.status, CrawlStatus::Error);
    assert!(record.last_crawled.is_some());
}

#[tokio::test]
async fn test_invalid_target_rejected_before_record() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let targets = vec![
        "example.com/page".to_string(),
        "http://".to_string(),
        "   ".to_string(),
    ];
    let results = crawl_all(&config, storage.clone(), &targets).await;

    for result in results {
        assert!(matches!(result, Err(CrawlError::InvalidTarget(_))));
    }
    assert!(storage.lock().unwrap().list_records(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_long_title_truncated() {
    let mock_server = MockServer::start().await;
    let long_title = "Ω".repeat(300);

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><head><title>{}</title></head></html>", long_title)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let results = crawl_all(&config, storage.clone(), &[mock_server.uri()]).await;
    let record = get_record(&storage, *results[0].as_ref().unwrap());

    assert_eq!(record.status, CrawlStatus::Done);
    assert_eq!(record.title.chars().count(), 255);
    assert!(long_title.starts_with(&record.title));
}

#[tokio::test]
async fn test_recrawl_creates_new_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Same</title>"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let target = mock_server.uri();
    let results = crawl_all(&config, storage.clone(), &[target.clone(), target]).await;
    let first = *results[0].as_ref().unwrap();
    let second = *results[1].as_ref().unwrap();

    assert_ne!(first, second);
    assert_eq!(get_record(&storage, first).status, CrawlStatus::Done);
    assert_eq!(get_record(&storage, second).status, CrawlStatus::Done);
}

#[tokio::test]
async fn test_delete_cascades_and_reports_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<h1>a</h1><h3>b</h3><a href="/nope">x</a>"#),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let results = crawl_all(&config, storage.clone(), &[mock_server.uri()]).await;
    let id = *results[0].as_ref().unwrap();

    let mut storage = storage.lock().unwrap();
    assert_eq!(storage.get_headings(id).unwrap().len(), 2);
    assert_eq!(storage.get_broken_links(id).unwrap().len(), 1);

    storage.delete_record(id).unwrap();

    assert!(storage.get_record(id).unwrap().is_none());
    assert!(storage.get_headings(id).unwrap().is_empty());
    assert!(storage.get_broken_links(id).unwrap().is_empty());

    let err = storage.delete_record(id).unwrap_err();
    assert!(matches!(err, StorageError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_full_queue_rejects_without_record() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.workers = 1;
    config.crawler.queue_capacity = 2;
    let storage = open_storage(&config);

    let pool = create_pool(&config, storage.clone());

    // No worker runs until this task yields, so the queue only fills up
    assert!(pool.start_crawl("http://127.0.0.1:9/a").is_ok());
    assert!(pool.start_crawl("http://127.0.0.1:9/b").is_ok());
    let err = pool.start_crawl("http://127.0.0.1:9/c").unwrap_err();

    assert!(matches!(err, CrawlError::Saturated { capacity: 2 }));
    assert_eq!(pool.queue_depth(), 2);
    assert_eq!(storage.lock().unwrap().list_records(10).unwrap().len(), 2);

    pool.shutdown().await;
    assert_eq!(
        storage
            .lock()
            .unwrap()
            .count_by_status(CrawlStatus::Error)
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_crawl_deadline_marks_record_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Too late</title>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let storage = open_storage(&config);

    let client = build_http_client(&config.user_agent).unwrap();
    let orchestrator = Orchestrator::new(&config.crawler, client, storage.clone())
        .with_crawl_timeout(Duration::from_millis(200));
    let pool = CrawlPool::from_config(&config.crawler, orchestrator);

    let id = pool.start_crawl(&mock_server.uri()).unwrap();
    pool.shutdown().await;

    let record = get_record(&storage, id);
    assert_eq!(record.status, CrawlStatus::Error);
    assert_eq!(record.title, "");
    assert!(record.last_crawled.is_some());
}
