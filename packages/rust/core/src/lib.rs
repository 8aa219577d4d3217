//! Brief synthesis for SiteBrief.
//!
//! This crate ties crawling, page selection, prompt assembly, completion,
//! and output repair into the two pipeline entry points on
//! [`BriefPipeline`]: `start_crawl` and `get_status_or_brief`.

pub mod completion;
pub mod pipeline;
pub mod prompt;
pub mod repair;
pub mod response;

pub use completion::{Completion, CompletionClient, CompletionRequest};
pub use pipeline::{
    BriefPipeline, PipelineConfig, ProgressReporter, SilentProgress, Stage, enforce_limits,
};
pub use prompt::{brief_schema, build_prompt};
pub use repair::{ParseDecision, decide, safe_json_parse};
pub use response::{
    ApiResponse, BriefMeta, BriefResponse, CompletedBrief, CrawlStarted, ProgressSnapshot,
    ReadySignal, respond,
};
