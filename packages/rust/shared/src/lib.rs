//! Shared types, error model, and configuration for SiteBrief.
//!
//! This crate is the foundation depended on by all other SiteBrief crates.
//! It provides:
//! - [`SiteBriefError`]: the unified error type
//! - Domain types ([`CrawlPage`], [`SourceChunk`], [`Intent`], [`Brief`])
//! - Configuration ([`AppConfig`], [`RequestBudget`], [`BriefLimits`], config loading)

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BriefLimits, CompletionConfig, CrawlServiceConfig, DefaultsConfig, RequestBudget,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, SiteBriefError};
pub use text::truncate_chars;
pub use types::{
    Brief, ClaimProof, CrawlPage, Entity, FaqPolicy, Intent, KeyFact, NOT_FOUND, PageMetadata,
    PricingOffer, SourceChunk, SourceRef, TrustSignal, UNKNOWN_URL,
};
