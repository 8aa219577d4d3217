//! Page scoring: URL pattern weights plus content and intent adjustments.

use std::sync::LazyLock;

use regex::Regex;

use sitebrief_shared::Intent;

/// Content characters per point of length bonus.
pub const LENGTH_BONUS_STEP: usize = 1_600;

/// Cap on the length bonus.
pub const MAX_LENGTH_BONUS: i64 = 3;

const HOMEPAGE_BONUS: i64 = 2;
const BLOG_PENALTY: i64 = 1;

/// Case-insensitive URL rules; each matching rule adds its weight once.
static SCORE_RULES: LazyLock<Vec<(Regex, i64)>> = LazyLock::new(|| {
    [
        (r"(?i)pricing|price|plans|plan", 4),
        (r"(?i)faq|support|help|docs|documentation", 3),
        (r"(?i)about|company|team|careers", 2),
        (r"(?i)contact|press|media", 2),
        (r"(?i)testimonial|review|customer|case-study|case-studies", 2),
        (r"(?i)security|privacy|terms|compliance", 2),
        (r"(?i)features|product|solutions|use-cases", 1),
        (r"(?i)blog|insights|resources", 1),
    ]
    .into_iter()
    .map(|(pattern, weight)| (Regex::new(pattern).expect("valid regex"), weight))
    .collect()
});

/// Base weight of a URL from the pattern table.
pub fn score_url(url: &str) -> i64 {
    SCORE_RULES
        .iter()
        .filter(|(pattern, _)| pattern.is_match(url))
        .map(|(_, weight)| weight)
        .sum()
}

/// Bonus for longer pages: one point per [`LENGTH_BONUS_STEP`] characters,
/// capped at [`MAX_LENGTH_BONUS`].
pub fn length_bonus(content_length: usize) -> i64 {
    i64::try_from(content_length / LENGTH_BONUS_STEP)
        .unwrap_or(MAX_LENGTH_BONUS)
        .min(MAX_LENGTH_BONUS)
}

/// Full page score used for ranking.
pub fn score_page(url: &str, intent: Intent, content_length: usize) -> i64 {
    let adjustment = match intent {
        Intent::Homepage => HOMEPAGE_BONUS,
        Intent::Blog => -BLOG_PENALTY,
        _ => 0,
    };
    score_url(url) + length_bonus(content_length) + adjustment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_additive_per_rule() {
        assert_eq!(score_url("https://acme.com/"), 0);
        assert_eq!(score_url("https://acme.com/pricing"), 4);
        // "pricing" and "plans" both belong to the same rule
        assert_eq!(score_url("https://acme.com/pricing/plans"), 4);
        assert_eq!(score_url("https://acme.com/support/pricing"), 7);
        assert_eq!(score_url("https://acme.com/BLOG/Insights"), 1);
    }

    #[test]
    fn adding_pricing_never_decreases_score() {
        let urls = [
            "https://acme.com/",
            "https://acme.com/blog/post",
            "https://acme.com/pricing",
            "https://acme.com/docs/faq",
            "Unknown URL",
        ];
        for url in urls {
            let with_pricing = format!("{url}/pricing");
            assert!(score_url(&with_pricing) >= score_url(url), "{url}");
            assert_eq!(score_url(url), score_url(url));
        }
    }

    #[test]
    fn length_bonus_is_capped() {
        assert_eq!(length_bonus(0), 0);
        assert_eq!(length_bonus(1_599), 0);
        assert_eq!(length_bonus(1_600), 1);
        assert_eq!(length_bonus(4_800), 3);
        assert_eq!(length_bonus(1_000_000), 3);
    }

    #[test]
    fn intent_adjustments() {
        assert_eq!(score_page("https://acme.com/", Intent::Homepage, 500), 2);
        assert_eq!(score_page("https://acme.com/pricing", Intent::Pricing, 2_000), 5);
        assert_eq!(score_page("https://acme.com/blog/post", Intent::Blog, 300), 0);
    }
}
