//! Request policy for the embedding web client.
//!
//! Pages served by the gateway may reference resources anywhere. The client
//! only lets through what the local gateway can answer (loopback http),
//! inline payloads, and hosts on the document's whitelist.
use std::net::IpAddr;

use docmirror_core::Whitelist;
use url::{Host, Url};

/// Schemes that never reach the network.
pub const INLINE_SCHEMES: &[&str] = &["data", "blob"];

/// Why a request was blocked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockReason {
    #[error("blocked scheme: {0}")]
    Scheme(String),

    #[error("blocked host: {0}")]
    Host(String),
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(BlockReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Check if a URL points at this machine.
pub fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(v4)) => IpAddr::V4(v4).is_loopback(),
        Some(Host::Ipv6(v6)) => IpAddr::V6(v6).is_loopback(),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

/// Scheme and host policy bound to one document's whitelist.
#[derive(Debug, Clone, Default)]
pub struct RequestPolicy {
    whitelist: Whitelist,
}

impl RequestPolicy {
    pub fn new(whitelist: Whitelist) -> Self {
        Self { whitelist }
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn evaluate(&self, url: &Url) -> Verdict {
        let scheme = url.scheme();
        if INLINE_SCHEMES.contains(&scheme) {
            return Verdict::Allow;
        }
        if !matches!(scheme, "http" | "https") {
            return Verdict::Block(BlockReason::Scheme(scheme.to_string()));
        }
        if scheme == "http" && is_loopback(url) {
            return Verdict::Allow;
        }
        if self.whitelist.is_whitelisted(url) {
            return Verdict::Allow;
        }
        Verdict::Block(BlockReason::Host(url.host_str().unwrap_or_default().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_loopback_detection() {
        assert!(is_loopback(&url("http://127.0.0.1:8080/index.html")));
        assert!(is_loopback(&url("http://[::1]:8080/")));
        assert!(is_loopback(&url("http://localhost/")));
        assert!(!is_loopback(&url("http://192.168.1.1/")));
        assert!(!is_loopback(&url("http://example.com/")));
    }

    #[test]
    fn test_gateway_requests_allowed() {
        let policy = RequestPolicy::default();
        assert!(policy.evaluate(&url("http://127.0.0.1:49152/library/os.html")).is_allowed());
    }

    #[test]
    fn test_inline_schemes_allowed() {
        let policy = RequestPolicy::default();
        assert!(policy.evaluate(&url("data:image/png;base64,AAAA")).is_allowed());
    }

    #[test]
    fn test_denied_schemes() {
        let policy = RequestPolicy::default();
        assert_eq!(
            policy.evaluate(&url("file:///etc/passwd")),
            Verdict::Block(BlockReason::Scheme("file".into()))
        );
        assert!(!policy.evaluate(&url("wss://example.com/socket")).is_allowed());
    }

    #[test]
    fn test_remote_hosts() {
        let policy = RequestPolicy::new(Whitelist::new(["static.example.org"]));
        assert!(policy.evaluate(&url("https://fonts.googleapis.com/css?family=Roboto")).is_allowed());
        assert!(policy.evaluate(&url("https://static.example.org/app.js")).is_allowed());
        assert_eq!(
            policy.evaluate(&url("https://tracker.example.com/pixel.gif")),
            Verdict::Block(BlockReason::Host("tracker.example.com".into()))
        );
    }

    #[test]
    fn test_https_loopback_not_the_gateway() {
        let policy = RequestPolicy::default();
        assert!(!policy.evaluate(&url("https://127.0.0.1/")).is_allowed());
    }
}
