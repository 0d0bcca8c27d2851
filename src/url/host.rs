use url::Url;

/// The part of a URL that decides whether two links live on the same site
///
/// Mirrors the `Host` header: the host string plus an explicit port. Default
/// ports are already elided by the URL parser, so `http://a.test:80/` and
/// `http://a.test/` share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl HostKey {
    /// Builds the host key of a URL
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use page_sounder::url::HostKey;
    ///
    /// let url = Url::parse("https://Example.COM:8443/path").unwrap();
    /// let key = HostKey::of(&url);
    /// assert_eq!(key.host.as_deref(), Some("example.com"));
    /// assert_eq!(key.port, Some(8443));
    /// ```
    pub fn of(url: &Url) -> Self {
        Self {
            host: url.host_str().map(|h| h.to_string()),
            port: url.port(),
        }
    }
}

/// Returns true if both URLs share the same host and port
pub fn same_host(a: &Url, b: &Url) -> bool {
    HostKey::of(a) == HostKey::of(b)
}
