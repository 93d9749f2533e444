//! Hosts trusted for resources that live outside a document's origin.

use std::collections::HashSet;

use url::Url;

/// Well-known CDN and font hosts trusted by every document.
pub const GLOBAL_WHITELIST: &[&str] = &[
    "cdnjs.cloudflare.com",
    "unpkg.com",
    "cdn.jsdelivr.net",
    "ajax.googleapis.com",
    "raw.githubusercontent.com",
    "fonts.googleapis.com",
    "fonts.gstatic.com",
];

/// Global hosts unioned with a per-document list.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    hosts: HashSet<String>,
}

impl Whitelist {
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = extra.into_iter().map(|h| h.as_ref().trim().to_lowercase()).filter(|h| !h.is_empty()).collect();
        Self { hosts }
    }

    pub fn contains_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        GLOBAL_WHITELIST.contains(&host.as_str()) || self.hosts.contains(&host)
    }

    /// Whether the host of `url` is trusted.
    pub fn is_whitelisted(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.contains_host(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_hosts() {
        let wl = Whitelist::default();
        assert!(wl.is_whitelisted(&Url::parse("https://fonts.gstatic.com/s/roboto.woff2").unwrap()));
        assert!(wl.is_whitelisted(&Url::parse("https://CDN.JSDELIVR.NET/npm/x.js").unwrap()));
        assert!(!wl.is_whitelisted(&Url::parse("https://tracker.example.com/pixel.gif").unwrap()));
    }

    #[test]
    fn test_document_hosts() {
        let wl = Whitelist::new(["static.example.org", "  "]);
        assert!(wl.is_whitelisted(&Url::parse("https://static.example.org/app.css").unwrap()));
        assert!(!wl.is_whitelisted(&Url::parse("https://example.org/").unwrap()));
    }

    #[test]
    fn test_url_without_host() {
        let wl = Whitelist::default();
        assert!(!wl.is_whitelisted(&Url::parse("data:text/plain,hi").unwrap()));
    }
}
