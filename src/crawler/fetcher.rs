//! HTTP fetcher implementation
//!
//! This module handles the page request of a crawl:
//! - Building HTTP clients with proper user agent strings
//! - GET requests following redirects
//! - Error classification (transport, HTTP status, body read)
//! - Charset decoding of the body

use crate::config::UserAgentConfig;
use crate::crawler::decode::decode_body;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for a page request
const MAX_REDIRECTS: usize = 10;

/// Errors that end a page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure before a response arrived
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a status of 400 or above
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The connection broke while the body was read
    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

/// A fetched and decoded page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL of the last response in the redirect chain
    pub final_url: Url,

    /// HTTP status code of the final response
    pub status_code: u16,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Body decoded to UTF-8
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use page_sounder::config::UserAgentConfig;
/// use page_sounder::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "PageSounder".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and decodes its body
///
/// Any status below 400 counts as success and its body is analyzed as-is,
/// whatever the Content-Type says. There is no retry and no request timeout
/// here; the caller bounds the whole crawl with its own deadline.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: classify_transport_error(&e),
        })?;

    let status = response.status();
    let final_url = response.url().clone();

    if status.as_u16() >= 400 {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await.map_err(|e| FetchError::Body {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let body = decode_body(&bytes, content_type.as_deref());

    tracing::debug!(
        "Fetched {} ({} bytes, HTTP {}) from {}",
        url,
        bytes.len(),
        status.as_u16(),
        final_url
    );

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

fn classify_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    }
}
