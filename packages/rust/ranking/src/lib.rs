//! Page ranking, selection, and source budgeting.
//!
//! Crawled pages are classified by URL intent, scored, de-duplicated by
//! canonical key, and selected under per-intent quotas. Selected pages are
//! then trimmed into [`SourceChunk`](sitebrief_shared::SourceChunk)s that fit
//! the character budget.

pub mod intent;
pub mod score;
pub mod select;
pub mod sources;

pub use intent::{classify_intent, is_homepage};
pub use score::{length_bonus, score_page, score_url};
pub use select::{INTENT_QUOTAS, RankedPage, canonical_key, rank_pages, select_pages};
pub use sources::{ELLIPSIS, build_sources, trim_content};
