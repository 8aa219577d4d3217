//! Validation of user-supplied crawl targets.

use url::Url;

use sitebrief_shared::{Result, SiteBriefError};

/// Trim the input and default the scheme to `https://` when none is given.
///
/// Input that already carries any `scheme://` prefix is left alone so that
/// non-http schemes fail validation instead of being wrapped. Blank input
/// yields an empty string.
pub fn normalize_url_input(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Whether `value` starts with `scheme://` (RFC 3986 scheme characters).
fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether `value` parses as an absolute http(s) URL with a host.
pub fn is_valid_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Normalize and validate a crawl target.
pub fn parse_target(value: &str) -> Result<Url> {
    let normalized = normalize_url_input(value);
    if normalized.is_empty() {
        return Err(SiteBriefError::validation("Missing url."));
    }
    if !is_valid_http_url(&normalized) {
        return Err(SiteBriefError::validation(format!("Invalid URL: {value}")));
    }
    Url::parse(&normalized).map_err(|e| SiteBriefError::validation(format!("Invalid URL: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_https_when_scheme_missing() {
        assert_eq!(normalize_url_input("  example.com "), "https://example.com");
        assert_eq!(normalize_url_input("HTTP://example.com"), "HTTP://example.com");
        assert_eq!(normalize_url_input("   "), "");
        assert_eq!(normalize_url_input("ftp://example.com"), "ftp://example.com");
        assert_eq!(
            normalize_url_input("example.com/redirect?to=https://other.com"),
            "https://example.com/redirect?to=https://other.com"
        );
    }

    #[test]
    fn only_http_schemes_are_valid() {
        assert!(is_valid_http_url("https://example.com/pricing"));
        assert!(is_valid_http_url("http://localhost:8080"));
        assert!(!is_valid_http_url("ftp://example.com"));
        assert!(!is_valid_http_url("file:///etc/passwd"));
        assert!(!is_valid_http_url("not a url"));
    }

    #[test]
    fn parse_target_rejects_blank_and_invalid() {
        assert!(matches!(
            parse_target(""),
            Err(SiteBriefError::Validation { .. })
        ));
        assert!(matches!(
            parse_target("https://"),
            Err(SiteBriefError::Validation { .. })
        ));
        assert!(matches!(
            parse_target("ftp://example.com"),
            Err(SiteBriefError::Validation { .. })
        ));
        let url = parse_target("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }
}
