use url::{ParseError, Url};

/// Resolves a link found in a document against the document's base URL
///
/// Standard RFC 3986 reference resolution: relative references take the
/// base's scheme, host and path; absolute references pass through, normalized
/// by the parser. An empty reference resolves to the base document itself.
///
/// # Arguments
///
/// * `raw` - The raw `href` value as it appears in the document
/// * `base` - The URL the document was fetched from
///
/// # Returns
///
/// * `Ok(Url)` - The absolute, resolved URL
/// * `Err(ParseError)` - The link cannot be parsed at all
///
/// # Examples
///
/// ```
/// use url::Url;
/// use page_sounder::url::resolve_link;
///
/// let base = Url::parse("http://x.test/docs/page").unwrap();
/// assert_eq!(resolve_link("intro", &base).unwrap().as_str(), "http://x.test/docs/intro");
/// assert_eq!(resolve_link("../up", &base).unwrap().as_str(), "http://x.test/up");
/// ```
pub fn resolve_link(raw: &str, base: &Url) -> Result<Url, ParseError> {
    base.join(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("http://x.test/page").unwrap()
    }

    #[test]
    fn test_root_relative() {
        let url = resolve_link("/about", &base_url()).unwrap();
        assert_eq!(url.as_str(), "http://x.test/about");
    }

    #[test]
    fn test_path_relative() {
        let base = Url::parse("http://x.test/a/b/c").unwrap();
        let url = resolve_link("d", &base).unwrap();
        assert_eq!(url.as_str(), "http://x.test/a/b/d");
    }

    #[test]
    fn test_dot_segments_removed() {
        let base = Url::parse("http://x.test/a/b/c").unwrap();
        let url = resolve_link("../../g", &base).unwrap();
        assert_eq!(url.as_str(), "http://x.test/g");
    }

    #[test]
    fn test_scheme_relative() {
        let url = resolve_link("//cdn.test/lib.js", &base_url()).unwrap();
        assert_eq!(url.as_str(), "http://cdn.test/lib.js");
    }

    #[test]
    fn test_query_only() {
        let url = resolve_link("?q=1", &base_url()).unwrap();
        assert_eq!(url.as_str(), "http://x.test/page?q=1");
    }

    #[test]
    fn test_fragment_only() {
        let url = resolve_link("#top", &base_url()).unwrap();
        assert_eq!(url.as_str(), "http://x.test/page#top");
    }

    #[test]
    fn test_empty_resolves_to_base() {
        let url = resolve_link("", &base_url()).unwrap();
        assert_eq!(url.as_str(), "http://x.test/page");
    }

    #[test]
    fn test_absolute_passes_through() {
        let url = resolve_link("https://Other.TEST/x", &base_url()).unwrap();
        assert_eq!(url.as_str(), "https://other.test/x");
    }

    #[test]
    fn test_unparsable_link() {
        assert!(resolve_link("http://[::1", &base_url()).is_err());
        assert!(resolve_link("http://", &base_url()).is_err());
    }
}
