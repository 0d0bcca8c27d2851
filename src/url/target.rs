use crate::{UrlError, UrlResult};
use url::{ParseError, Url};

/// Validates a crawl target before any work is scheduled
///
/// The target must be an absolute URL with a non-empty scheme and host.
///
/// # Returns
///
/// * `Ok(Url)` - The parsed target
/// * `Err(UrlError)` - The input is not a usable crawl target
///
/// # Examples
///
/// ```
/// use page_sounder::url::validate_target;
///
/// assert!(validate_target("https://example.com/").is_ok());
/// assert!(validate_target("example.com/page").is_err());
/// assert!(validate_target("mailto:someone@example.com").is_err());
/// ```
pub fn validate_target(raw: &str) -> UrlResult<Url> {
    let raw = raw.trim();

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => {
            return Err(UrlError::MissingScheme(raw.to_string()))
        }
        Err(e) => return Err(UrlError::Parse(e)),
    };

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost(raw.to_string())),
    }
}
