//! Document analysis
//!
//! This module turns a decoded HTML document into the facts stored on a
//! crawl record:
//! - title, per-level heading counts and the login-form signal (one token pass)
//! - internal/external link counts (links resolved against the page URL)
//! - broken links (every resolved link probed over HTTP)
//! - the declared markup generation

mod headings;
mod scanner;
mod version;

pub use headings::{HeadingCounts, HeadingLevel};
pub use scanner::{scan_document, DocumentScan};
pub use version::{detect_html_version, HtmlVersion};

use crate::crawler::LinkProber;
use crate::url::{classify_link, resolve_link, LinkKind};
use url::Url;

/// A link whose probe reported failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    /// Absolute, resolved URL of the link
    pub url: String,

    /// Status observed by the probe (500 for network failures)
    pub status: u16,
}

/// Everything derived from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAnalysis {
    pub title: String,
    pub headings: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links: Vec<BrokenLink>,
    pub has_login: bool,
}

/// Links of a document after resolution and classification
#[derive(Debug, Clone, Default)]
pub struct LinkTally {
    /// Resolved links in document order, duplicates kept
    pub resolved: Vec<Url>,
    pub internal: u32,
    pub external: u32,
}

/// Resolves and classifies raw `href` values against the page URL
///
/// Links that fail to parse are dropped here and appear in no count.
pub fn tally_links(links: &[String], base: &Url) -> LinkTally {
    let mut tally = LinkTally::default();

    for raw in links {
        let resolved = match resolve_link(raw, base) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping unparsable link {:?}: {}", raw, e);
                continue;
            }
        };

        match classify_link(&resolved, base) {
            LinkKind::Internal => tally.internal += 1,
            LinkKind::External => tally.external += 1,
        }
        tally.resolved.push(resolved);
    }

    tally
}

/// Analyzes a decoded document fetched from `base`
///
/// The token scan runs first and synchronously; the discovered links are then
/// probed concurrently and the analysis is returned once every probe is in.
pub async fn analyze(document: &str, base: &Url, prober: &LinkProber) -> PageAnalysis {
    let scan = scan_document(document);
    let tally = tally_links(&scan.links, base);

    tracing::debug!(
        "Scanned {}: {} internal, {} external, {} heading levels",
        base,
        tally.internal,
        tally.external,
        scan.headings.len()
    );

    let broken_links = prober.find_broken(tally.resolved).await;

    PageAnalysis {
        title: scan.title.unwrap_or_default(),
        headings: scan.headings,
        internal_links: tally.internal,
        external_links: tally.external,
        broken_links,
        has_login: scan.has_login,
    }
}
