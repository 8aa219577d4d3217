//! Ranking and quota-based selection of crawled pages.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use sitebrief_shared::{CrawlPage, Intent};

use crate::intent::classify_intent;
use crate::score::score_page;

/// Per-intent caps applied, in this order, after the homepage pick.
pub const INTENT_QUOTAS: [(Intent, usize); 9] = [
    (Intent::Pricing, 4),
    (Intent::Product, 4),
    (Intent::Faq, 3),
    (Intent::Trust, 3),
    (Intent::About, 2),
    (Intent::Legal, 2),
    (Intent::Contact, 2),
    (Intent::Blog, 1),
    (Intent::General, 8),
];

/// A crawl page with its ranking attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPage {
    pub page: CrawlPage,
    pub canonical_key: String,
    pub intent: Intent,
    pub score: i64,
    /// Characters of trimmed markdown.
    pub content_length: usize,
}

impl RankedPage {
    /// Rank one page; `None` when it has no content.
    pub fn from_page(page: CrawlPage) -> Option<Self> {
        let content_length = page.markdown().trim().chars().count();
        if content_length == 0 {
            return None;
        }
        let url = page.url();
        let intent = classify_intent(url);
        Some(Self {
            canonical_key: canonical_key(url),
            score: score_page(url, intent, content_length),
            intent,
            content_length,
            page,
        })
    }
}

/// De-duplication key: origin plus path without trailing slashes.
///
/// Query and fragment are ignored. Unparseable input falls back to the
/// trimmed raw string.
pub fn canonical_key(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(parsed) => format!(
            "{}{}",
            parsed.origin().ascii_serialization(),
            parsed.path().trim_end_matches('/')
        ),
        Err(_) => trimmed.to_string(),
    }
}

/// Rank every non-empty page, best first.
///
/// Ties on score go to the longer page; remaining ties keep input order.
pub fn rank_pages(pages: Vec<CrawlPage>) -> Vec<RankedPage> {
    let mut ranked: Vec<RankedPage> = pages.into_iter().filter_map(RankedPage::from_page).collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.content_length.cmp(&a.content_length))
    });
    ranked
}

/// Pick at most `max_selected` diverse pages.
///
/// The best homepage goes first, then each intent fills up to its quota in
/// [`INTENT_QUOTAS`] order, then any remaining slots are filled by score.
/// A canonical key is never selected twice.
pub fn select_pages(pages: Vec<CrawlPage>, max_selected: usize) -> Vec<RankedPage> {
    let ranked = rank_pages(pages);
    let mut selection = Selection::new(ranked.len(), max_selected);

    if let Some(index) = ranked.iter().position(|p| p.intent == Intent::Homepage) {
        selection.take(index, &ranked);
    }

    for (intent, quota) in INTENT_QUOTAS {
        let mut taken = 0;
        for index in 0..ranked.len() {
            if taken >= quota || selection.is_full() {
                break;
            }
            if ranked[index].intent == intent && selection.take(index, &ranked) {
                taken += 1;
            }
        }
    }

    for index in 0..ranked.len() {
        if selection.is_full() {
            break;
        }
        selection.take(index, &ranked);
    }

    debug!(
        candidates = ranked.len(),
        selected = selection.order.len(),
        max_selected,
        "page selection complete"
    );

    selection.finish(ranked)
}

/// Bookkeeping for one selection pass.
struct Selection {
    order: Vec<usize>,
    picked: Vec<bool>,
    keys: HashSet<String>,
    max: usize,
}

impl Selection {
    fn new(len: usize, max: usize) -> Self {
        Self {
            order: Vec::new(),
            picked: vec![false; len],
            keys: HashSet::new(),
            max,
        }
    }

    fn is_full(&self) -> bool {
        self.order.len() >= self.max
    }

    /// Select `index` unless full, already picked, or a duplicate key.
    fn take(&mut self, index: usize, ranked: &[RankedPage]) -> bool {
        if self.is_full() || self.picked[index] {
            return false;
        }
        if !self.keys.insert(ranked[index].canonical_key.clone()) {
            return false;
        }
        self.picked[index] = true;
        self.order.push(index);
        true
    }

    fn finish(self, ranked: Vec<RankedPage>) -> Vec<RankedPage> {
        let mut slots: Vec<Option<RankedPage>> = ranked.into_iter().map(Some).collect();
        self.order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}
