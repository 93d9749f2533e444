//! Origin fetch pipeline for mirrored documents.
//!
//! ### Scope
//! - A relative path targets `origin_prefix + path`; paths that resolve
//!   outside the prefix are rejected before any network traffic.
//! - A path that is an absolute http(s) URL is fetched as-is. That is how a
//!   foreign redirect, rewritten onto the gateway, comes back.
//! - Redirects are never followed: a 3xx is a result to be cached, and the
//!   gateway rewrites its `Location`.
//!
//! ### Concurrency
//! - A semaphore bounds in-flight requests per origin (default 5), and the
//!   connection pool is sized to match.
//!
//! ### Conditional requests
//! - When a previous fetch time is known, `If-Modified-Since` is sent and a
//!   304 comes back as [`FetchOutcome::NotModified`] instead of a body.

pub mod url;

use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

pub use url::{UrlError, absolute, parse_origin_prefix, resolve, target};

use docmirror_core::{AppConfig, CacheEntry, Error, Item};

/// Configuration for the origin fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "docmirror/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum concurrent connections to the origin (default: 5)
    pub max_connections: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "docmirror/0.1".to_string(), timeout: Duration::from_millis(20000), max_connections: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_connections: config.max_connections,
        }
    }
}

/// A complete origin response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: ::url::Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Lower-cased header name to value; repeated headers are joined with ", "
    pub headers: BTreeMap<String, String>,
    /// Response body bytes
    pub body: Bytes,
    /// Protocol version, e.g. "HTTP/1.1"
    pub version: String,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get("location").map(String::as_str)
    }

    /// Item to hand back to the caller, stamped with `updated`.
    pub fn to_item(&self, updated: i64) -> Item {
        Item {
            content: self.body.clone(),
            status: Some(self.status.as_u16()),
            content_type: self.content_type().map(str::to_string),
            location: self.location().map(str::to_string),
            updated: Some(updated),
        }
    }

    /// Row to persist under `path`.
    pub fn to_entry(&self, path: &str, updated: i64) -> CacheEntry {
        CacheEntry {
            path: path.to_string(),
            status: self.status.as_u16(),
            headers: self.headers.clone(),
            content: Some(self.body.to_vec()),
            updated: Some(updated),
        }
    }
}

/// Result of a fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The origin answered 304 to a conditional request.
    NotModified,
    /// Any other response, including 3xx and 4xx.
    Fetched(FetchResponse),
}

/// Connection-limited HTTP client bound to one origin prefix.
pub struct OriginFetcher {
    http: Client,
    prefix: ::url::Url,
    permits: Arc<Semaphore>,
}

impl OriginFetcher {
    /// Create a fetcher for `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for a malformed prefix and
    /// `Error::Fetch` if the HTTP client cannot be built.
    pub fn new(prefix: &str, config: FetchConfig) -> Result<Self, Error> {
        let prefix = parse_origin_prefix(prefix).map_err(|e| Error::Configuration(e.to_string()))?;
        let max_connections = config.max_connections.max(1);

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(max_connections)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, prefix, permits: Arc::new(Semaphore::new(max_connections)) })
    }

    /// Fetch `path` relative to the origin prefix, or as-is when it is an
    /// absolute http(s) URL.
    ///
    /// `if_modified_since` is a Unix epoch; when given, a 304 answer yields
    /// [`FetchOutcome::NotModified`].
    pub async fn fetch(&self, path: &str, if_modified_since: Option<i64>) -> Result<FetchOutcome, Error> {
        let url = target(&self.prefix, path).map_err(|e| Error::Fetch(e.to_string()))?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::Fetch(format!("fetcher closed: {}", e)))?;

        let start = Instant::now();
        let mut request = self.http.get(url.as_str());
        if let Some(since) = if_modified_since.and_then(http_date) {
            request = request.header(header::IF_MODIFIED_SINCE, since);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("network error for {}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED && if_modified_since.is_some() {
            tracing::debug!("not modified {}", url);
            return Ok(FetchOutcome::NotModified);
        }

        let version = format!("{:?}", response.version());
        let headers = collect_headers(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("failed to read response from {}: {}", url, e)))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "FETCH {} {} {} {} {} {}ms",
            url,
            version,
            status.as_u16(),
            headers.get("content-type").map(String::as_str).unwrap_or("-"),
            headers.get("location").map(String::as_str).unwrap_or("-"),
            fetch_ms,
        );

        Ok(FetchOutcome::Fetched(FetchResponse { url, status, headers, body, version, fetch_ms }))
    }

    /// The normalized origin prefix.
    pub fn prefix(&self) -> &::url::Url {
        &self.prefix
    }
}

fn collect_headers(headers: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

/// Format a Unix epoch as an RFC 7231 IMF-fixdate.
pub fn http_date(epoch: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(epoch, 0).map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}
