//! Content trimming and character budgeting for selected pages.

use tracing::debug;

use sitebrief_shared::{RequestBudget, SourceChunk, truncate_chars};

use crate::select::RankedPage;

/// Appended when content is cut.
pub const ELLIPSIS: &str = "...";

/// Collapse whitespace runs to single spaces and cut to `max_chars`,
/// appending [`ELLIPSIS`] when anything was removed.
pub fn trim_content(content: &str, max_chars: usize) -> String {
    let compact = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= max_chars {
        return compact;
    }
    format!("{}{ELLIPSIS}", truncate_chars(&compact, max_chars))
}

/// Turn selected pages into prompt sources under the per-page and total
/// character budgets.
///
/// The page that crosses the total budget is cut to the remaining
/// allowance; once that allowance drops below `min_tail_chars`, no further
/// pages are included.
pub fn build_sources(selected: &[RankedPage], budget: &RequestBudget) -> Vec<SourceChunk> {
    let mut sources = Vec::with_capacity(selected.len());
    let mut total_chars = 0usize;

    for ranked in selected {
        let markdown = ranked.page.markdown();
        let mut content = trim_content(markdown, budget.max_chars_per_page);
        if content.is_empty() {
            continue;
        }

        let mut length = content.chars().count();
        if total_chars + length > budget.max_total_chars {
            let remaining = budget.max_total_chars.saturating_sub(total_chars);
            if remaining < budget.min_tail_chars {
                debug!(remaining, included = sources.len(), "total character budget exhausted");
                break;
            }
            content = trim_content(markdown, remaining);
            length = content.chars().count();
        }

        total_chars += length;
        sources.push(SourceChunk {
            url: ranked.page.url().to_string(),
            title: ranked.page.title().to_string(),
            content,
            intent: Some(ranked.intent),
        });
    }

    debug!(sources = sources.len(), total_chars, "sources built");
    sources
}

#[cfg(test)]
mod tests {
    use sitebrief_shared::{CrawlPage, Intent};

    use super::*;
    use crate::select::select_pages;

    fn budget(per_page: usize, total: usize) -> RequestBudget {
        RequestBudget {
            max_chars_per_page: per_page,
            max_total_chars: total,
            ..RequestBudget::default()
        }
    }

    #[test]
    fn trim_collapses_whitespace() {
        assert_eq!(trim_content("  a \n\n b\t c  ", 100), "a b c");
        assert_eq!(trim_content("", 10), "");
    }

    #[test]
    fn trim_cuts_with_ellipsis() {
        let out = trim_content("abcdefghij", 4);
        assert_eq!(out, "abcd...");
        assert!(out.chars().count() <= 4 + ELLIPSIS.len());
    }

    #[test]
    fn trim_is_idempotent() {
        let inputs = [
            "plain",
            "  spaced   out\ttext\n",
            "word word word word word word word word",
            "héllo wörld ünïcode ✓ text that is long",
        ];
        for input in inputs {
            for n in [0, 3, 5, 10, 100] {
                let once = trim_content(input, n);
                assert_eq!(trim_content(&once, n), once, "{input:?} @ {n}");
                assert!(once.chars().count() <= n + 3);
            }
        }
    }

    #[test]
    fn sources_respect_per_page_budget() {
        let selected = select_pages(
            vec![CrawlPage::new("https://acme.com/", "x".repeat(500)).with_title("Acme")],
            5,
        );
        let sources = build_sources(&selected, &budget(100, 10_000));
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].content.chars().count(), 103);
        assert_eq!(sources[0].title, "Acme");
        assert_eq!(sources[0].intent, Some(Intent::Homepage));
    }

    #[test]
    fn last_page_is_cut_to_remaining_budget() {
        let selected = select_pages(
            vec![
                CrawlPage::new("https://acme.com/", "a".repeat(700)),
                CrawlPage::new("https://acme.com/pricing", "b".repeat(700)),
            ],
            5,
        );
        let sources = build_sources(&selected, &budget(1_000, 1_000));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].content.len(), 700);
        assert_eq!(sources[1].content, format!("{}...", "b".repeat(300)));
    }

    #[test]
    fn small_remainder_stops_inclusion() {
        let selected = select_pages(
            vec![
                CrawlPage::new("https://acme.com/", "a".repeat(900)),
                CrawlPage::new("https://acme.com/pricing", "b".repeat(700)),
                CrawlPage::new("https://acme.com/faq", "c".repeat(50)),
            ],
            5,
        );
        let sources = build_sources(&selected, &budget(1_000, 1_000));
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://acme.com/");
    }
}
