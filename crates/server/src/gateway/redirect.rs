//! Location rewriting so redirects stay on the local gateway.

use docmirror_core::Error;
use url::Url;

/// Map a redirect target onto the gateway.
///
/// - root-relative targets pass through
/// - targets under the origin prefix become root-relative
/// - other absolute http(s) URLs are re-routed through `gateway_prefix`
///
/// Anything else is `Error::InvalidRedirect`.
pub fn fix_redirect(location: &str, origin: Option<&Url>, gateway_prefix: &str) -> Result<String, Error> {
    if location.starts_with('/') {
        return Ok(location.to_string());
    }

    if let Some(rest) = origin.and_then(|o| location.strip_prefix(o.as_str())) {
        return Ok(format!("/{rest}"));
    }

    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(format!("{gateway_prefix}{location}"));
    }

    Err(Error::InvalidRedirect(location.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATEWAY: &str = "http://127.0.0.1:40000/";

    fn origin() -> Url {
        Url::parse("https://docs.example.com/v2/").unwrap()
    }

    #[test]
    fn test_root_relative_unchanged() {
        assert_eq!(fix_redirect("/v2/other.html", Some(&origin()), GATEWAY).unwrap(), "/v2/other.html");
    }

    #[test]
    fn test_same_origin_becomes_root_relative() {
        assert_eq!(fix_redirect("https://docs.example.com/v2/foo/bar", Some(&origin()), GATEWAY).unwrap(), "/foo/bar");
        assert_eq!(fix_redirect("https://docs.example.com/v2/", Some(&origin()), GATEWAY).unwrap(), "/");
    }

    #[test]
    fn test_foreign_absolute_goes_through_gateway() {
        assert_eq!(
            fix_redirect("https://example.org/x", Some(&origin()), GATEWAY).unwrap(),
            "http://127.0.0.1:40000/https://example.org/x"
        );
        assert_eq!(
            fix_redirect("https://docs.example.com/v1/", Some(&origin()), GATEWAY).unwrap(),
            "http://127.0.0.1:40000/https://docs.example.com/v1/"
        );
    }

    #[test]
    fn test_no_origin() {
        assert_eq!(
            fix_redirect("http://a.example/", None, GATEWAY).unwrap(),
            "http://127.0.0.1:40000/http://a.example/"
        );
    }

    #[test]
    fn test_invalid_target() {
        assert!(matches!(fix_redirect("other.html", Some(&origin()), GATEWAY), Err(Error::InvalidRedirect(_))));
        assert!(matches!(fix_redirect("ftp://x/y", None, GATEWAY), Err(Error::InvalidRedirect(_))));
    }
}
