//! URL-based intent classification.
//!
//! Rules are evaluated in order and the first match wins, so the order of
//! [`INTENT_RULES`] is part of the behaviour: a `/pricing-faq` page is
//! pricing, not faq.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use sitebrief_shared::Intent;

/// Paths treated as the site's homepage.
const HOMEPAGE_PATHS: [&str; 4] = ["/", "/home", "/index", "/index.html"];

/// Ordered `(tag, pattern)` pairs tried after the homepage check.
static INTENT_RULES: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    [
        (Intent::Pricing, r"pricing|price|plans?"),
        (Intent::Faq, r"faq|support|help|docs|documentation"),
        (Intent::Trust, r"testimonial|review|customer|case-stud|trust"),
        (Intent::About, r"about|company|team|careers"),
        (Intent::Legal, r"privacy|terms|legal|security|compliance|cookie"),
        (Intent::Product, r"feature|product|solution|use-case|platform"),
        (Intent::Contact, r"contact|press|media"),
        (Intent::Blog, r"blog|insights|resources|news|article"),
    ]
    .into_iter()
    .map(|(intent, pattern)| (intent, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Lowercased path of `url`, trailing slashes stripped (`/` for the root).
///
/// Unparseable input is classified on its lowercased raw text.
fn normalized_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let path = parsed.path().trim_end_matches('/').to_ascii_lowercase();
    Some(if path.is_empty() { "/".to_string() } else { path })
}

/// Whether `url` points at the site root or a conventional index page.
pub fn is_homepage(url: &str) -> bool {
    normalized_path(url).is_some_and(|path| HOMEPAGE_PATHS.contains(&path.as_str()))
}

/// Classify a page by its URL.
pub fn classify_intent(url: &str) -> Intent {
    if is_homepage(url) {
        return Intent::Homepage;
    }

    let subject = normalized_path(url).unwrap_or_else(|| url.trim().to_ascii_lowercase());
    INTENT_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&subject))
        .map_or(Intent::General, |(intent, _)| *intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homepage_variants() {
        for url in [
            "https://acme.com",
            "https://acme.com/",
            "https://acme.com/home/",
            "https://acme.com/index.html",
            "https://acme.com/?ref=nav",
        ] {
            assert_eq!(classify_intent(url), Intent::Homepage, "{url}");
        }
        assert!(!is_homepage("https://acme.com/homepage-builder"));
    }

    #[test]
    fn categories_by_path() {
        let cases = [
            ("https://acme.com/pricing", Intent::Pricing),
            ("https://acme.com/plans/team", Intent::Pricing),
            ("https://acme.com/help/billing", Intent::Faq),
            ("https://acme.com/customers/globex", Intent::Trust),
            ("https://acme.com/about-us", Intent::About),
            ("https://acme.com/legal/privacy", Intent::Legal),
            ("https://acme.com/features", Intent::Product),
            ("https://acme.com/contact", Intent::Contact),
            ("https://acme.com/blog/launch", Intent::Blog),
            ("https://acme.com/careers-at-night", Intent::About),
            ("https://acme.com/xyz", Intent::General),
        ];
        for (url, expected) in cases {
            assert_eq!(classify_intent(url), expected, "{url}");
        }
    }

    #[test]
    fn first_match_wins() {
        // pricing precedes faq, faq precedes about
        assert_eq!(classify_intent("https://acme.com/pricing-faq"), Intent::Pricing);
        assert_eq!(classify_intent("https://acme.com/support/about"), Intent::Faq);
        assert_eq!(classify_intent("https://acme.com/blog/pricing-update"), Intent::Pricing);
    }

    #[test]
    fn host_does_not_drive_intent() {
        assert_eq!(classify_intent("https://pricing.example.com/xyz"), Intent::General);
    }

    #[test]
    fn unparseable_url_uses_raw_text() {
        assert_eq!(classify_intent("Unknown URL"), Intent::General);
        assert_eq!(classify_intent("not a url /pricing"), Intent::Pricing);
    }
}
