//! Crawl-service client and crawl target handling.
//!
//! This crate provides:
//! - [`CrawlClient`]: starts crawl jobs, polls their status, and follows pagination
//! - [`parse_target`]: normalizes and validates user-supplied site URLs

pub mod client;
pub mod target;

pub use client::{CrawlBatch, CrawlClient, CrawlStatus, Pagination};
pub use target::{is_valid_http_url, normalize_url_input, parse_target};
