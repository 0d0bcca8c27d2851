//! URL handling module for Page-Sounder
//!
//! This module validates crawl targets, resolves links found in a document
//! against the document's base URL, and classifies resolved links as
//! internal or external.

mod host;
mod resolve;
mod target;

// Re-export main functions
pub use host::{same_host, HostKey};
pub use resolve::resolve_link;
pub use target::validate_target;

use url::Url;

/// Link classification relative to the crawled document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Same host (and port) as the document
    Internal,
    /// Any other host, or no host at all (`mailto:`, `javascript:`, ...)
    External,
}

impl LinkKind {
    /// Returns true for links pointing back at the crawled host
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Classifies a resolved link against the document's base URL
///
/// The comparison is an exact host-string equality on the resolved URL, with
/// the port taken into account the way an HTTP `Host` header would carry it.
/// Both sides are compared after URL parsing has normalized them: hosts are
/// lowercased and default ports dropped, so `http://X.TEST:80/` is internal
/// to `http://x.test/`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use page_sounder::url::{classify_link, LinkKind};
///
/// let base = Url::parse("http://x.test/page").unwrap();
/// let about = Url::parse("http://x.test/about").unwrap();
/// let other = Url::parse("http://other.test/x").unwrap();
///
/// assert_eq!(classify_link(&about, &base), LinkKind::Internal);
/// assert_eq!(classify_link(&other, &base), LinkKind::External);
/// ```
pub fn classify_link(resolved: &Url, base: &Url) -> LinkKind {
    if same_host(resolved, base) {
        LinkKind::Internal
    } else {
        LinkKind::External
    }
}
