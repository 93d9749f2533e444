//! Origin prefix validation and path resolution.

/// Error type for origin prefix handling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid prefix {0}: must end with '/'")]
    MissingTrailingSlash(String),

    #[error("{path} resolves outside of {prefix}")]
    OutsidePrefix { path: String, prefix: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse and normalize an origin prefix.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http or https scheme
/// 3. Require a trailing `/` so relative paths join underneath it
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
pub fn parse_origin_prefix(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if !parsed.path().ends_with('/') || parsed.query().is_some() {
        return Err(UrlError::MissingTrailingSlash(trimmed.to_string()));
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a document-relative path against the origin prefix.
///
/// The result must stay underneath the prefix; absolute URLs and `..`
/// segments that climb out of it are rejected.
pub fn resolve(prefix: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    let joined = prefix.join(path).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !joined.as_str().starts_with(prefix.as_str()) {
        return Err(UrlError::OutsidePrefix { path: path.to_string(), prefix: prefix.to_string() });
    }

    Ok(joined)
}

/// Pick the URL a request path points at.
///
/// A path that is itself an absolute http(s) URL (what a rewritten foreign
/// redirect comes back as) is taken as-is. Anything else goes through
/// [`resolve`] and must stay underneath the prefix.
pub fn target(prefix: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    match absolute(path) {
        Some(url) => url,
        None => resolve(prefix, path),
    }
}

/// Parse `path` when it starts with an http(s) scheme.
pub fn absolute(path: &str) -> Option<Result<url::Url, UrlError>> {
    let scheme = path.split_once("://")?.0;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return None;
    }
    Some(url::Url::parse(path).map_err(|e| UrlError::InvalidUrl(e.to_string())))
}
