//! Application configuration for SiteBrief.
//!
//! User config lives at `~/.sitebrief/sitebrief.toml`.
//! Environment variables override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SiteBriefError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitebrief.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitebrief";

// ---------------------------------------------------------------------------
// Config structs (matching sitebrief.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Crawl service settings.
    #[serde(default)]
    pub crawl: CrawlServiceConfig,

    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Numeric limits applied to every pipeline run.
    #[serde(default)]
    pub budget: RequestBudget,

    /// Per-field limits embedded in the prompt.
    #[serde(default)]
    pub limits: BriefLimits,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Goal used when the caller supplies none.
    #[serde(default = "default_goal")]
    pub goal: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            goal: default_goal(),
        }
    }
}

fn default_goal() -> String {
    "Competitor Snapshot".into()
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlServiceConfig {
    /// Base URL of the crawl API (no trailing slash).
    #[serde(default = "default_crawl_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_crawl_api_key_env")]
    pub api_key_env: String,

    /// Maximum pages the crawl service is asked to fetch.
    #[serde(default = "default_crawl_limit")]
    pub page_limit: u32,

    /// Link depth the crawl service may follow from the start URL.
    #[serde(default = "default_discovery_depth")]
    pub max_discovery_depth: u32,

    /// Crawl the whole domain rather than only paths under the start URL.
    #[serde(default)]
    pub crawl_entire_domain: bool,
}

impl Default for CrawlServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_crawl_base_url(),
            api_key_env: default_crawl_api_key_env(),
            page_limit: default_crawl_limit(),
            max_discovery_depth: default_discovery_depth(),
            crawl_entire_domain: false,
        }
    }
}

fn default_crawl_base_url() -> String {
    "https://api.firecrawl.dev/v2".into()
}
fn default_crawl_api_key_env() -> String {
    "FIRECRAWL_API_KEY".into()
}
fn default_crawl_limit() -> u32 {
    50
}
fn default_discovery_depth() -> u32 {
    3
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Full URL of the messages endpoint.
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_completion_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Token ceiling for the brief completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Token ceiling for the repair completion.
    #[serde(default = "default_max_tokens")]
    pub repair_max_tokens: u32,

    /// Sampling temperature for the brief completion. Repair always uses 0.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            api_key_env: default_completion_api_key_env(),
            model: default_model(),
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
            repair_max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_completion_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".into()
}
fn default_completion_api_key_env() -> String {
    "CLAUDE_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_api_version() -> String {
    "2023-06-01".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f64 {
    0.2
}

/// `[budget]` section: every numeric bound a pipeline run respects.
///
/// All values must be positive; zeros read from the file are replaced by the
/// built-in default (see [`RequestBudget::sanitized`]). Retry counts may be zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBudget {
    /// Maximum cursor-pagination requests after the status call.
    #[serde(default = "default_max_pagination_requests")]
    pub max_pagination_requests: u32,
    /// Maximum crawl pages kept across all result pages.
    #[serde(default = "default_max_collected_pages")]
    pub max_collected_pages: usize,
    /// Maximum pages fed to the prompt.
    #[serde(default = "default_max_selected_pages")]
    pub max_selected_pages: usize,
    /// Character cap for a single source chunk.
    #[serde(default = "default_max_chars_per_page")]
    pub max_chars_per_page: usize,
    /// Character cap across all source chunks.
    #[serde(default = "default_max_total_chars")]
    pub max_total_chars: usize,
    /// Below this remaining budget no further page is included.
    #[serde(default = "default_min_tail_chars")]
    pub min_tail_chars: usize,
    /// Per-attempt timeout for crawl-service calls.
    #[serde(default = "default_crawl_timeout_ms")]
    pub crawl_timeout_ms: u64,
    /// Retries after the first crawl-service attempt.
    #[serde(default = "default_crawl_retries")]
    pub crawl_retries: u32,
    /// First backoff delay; doubles per attempt up to 5 s.
    #[serde(default = "default_retry_base_delay_ms")]
    pub crawl_retry_base_delay_ms: u64,
    /// Timeout for the brief completion call.
    #[serde(default = "default_completion_timeout_ms")]
    pub completion_timeout_ms: u64,
    /// Timeout for the repair completion call.
    #[serde(default = "default_repair_timeout_ms")]
    pub repair_timeout_ms: u64,
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self {
            max_pagination_requests: default_max_pagination_requests(),
            max_collected_pages: default_max_collected_pages(),
            max_selected_pages: default_max_selected_pages(),
            max_chars_per_page: default_max_chars_per_page(),
            max_total_chars: default_max_total_chars(),
            min_tail_chars: default_min_tail_chars(),
            crawl_timeout_ms: default_crawl_timeout_ms(),
            crawl_retries: default_crawl_retries(),
            crawl_retry_base_delay_ms: default_retry_base_delay_ms(),
            completion_timeout_ms: default_completion_timeout_ms(),
            repair_timeout_ms: default_repair_timeout_ms(),
        }
    }
}

fn default_max_pagination_requests() -> u32 {
    10
}
fn default_max_collected_pages() -> usize {
    300
}
fn default_max_selected_pages() -> usize {
    24
}
fn default_max_chars_per_page() -> usize {
    4_000
}
fn default_max_total_chars() -> usize {
    160_000
}
fn default_min_tail_chars() -> usize {
    200
}
fn default_crawl_timeout_ms() -> u64 {
    30_000
}
fn default_crawl_retries() -> u32 {
    2
}
fn default_retry_base_delay_ms() -> u64 {
    600
}
fn default_completion_timeout_ms() -> u64 {
    180_000
}
fn default_repair_timeout_ms() -> u64 {
    90_000
}

impl RequestBudget {
    /// Replace every zero bound with its built-in default.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            max_pagination_requests: positive_or(
                "max_pagination_requests",
                self.max_pagination_requests,
                d.max_pagination_requests,
            ),
            max_collected_pages: positive_or(
                "max_collected_pages",
                self.max_collected_pages,
                d.max_collected_pages,
            ),
            max_selected_pages: positive_or(
                "max_selected_pages",
                self.max_selected_pages,
                d.max_selected_pages,
            ),
            max_chars_per_page: positive_or(
                "max_chars_per_page",
                self.max_chars_per_page,
                d.max_chars_per_page,
            ),
            max_total_chars: positive_or("max_total_chars", self.max_total_chars, d.max_total_chars),
            min_tail_chars: positive_or("min_tail_chars", self.min_tail_chars, d.min_tail_chars),
            crawl_timeout_ms: positive_or("crawl_timeout_ms", self.crawl_timeout_ms, d.crawl_timeout_ms),
            crawl_retries: self.crawl_retries,
            crawl_retry_base_delay_ms: positive_or(
                "crawl_retry_base_delay_ms",
                self.crawl_retry_base_delay_ms,
                d.crawl_retry_base_delay_ms,
            ),
            completion_timeout_ms: positive_or(
                "completion_timeout_ms",
                self.completion_timeout_ms,
                d.completion_timeout_ms,
            ),
            repair_timeout_ms: positive_or(
                "repair_timeout_ms",
                self.repair_timeout_ms,
                d.repair_timeout_ms,
            ),
        }
    }
}

fn positive_or<T: PartialEq + Default + Copy + std::fmt::Display>(name: &str, value: T, fallback: T) -> T {
    if value == T::default() {
        warn!(field = name, %fallback, "budget value must be positive, using default");
        fallback
    } else {
        value
    }
}

/// `[limits]` section: advisory per-field maxima written into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefLimits {
    #[serde(default = "default_ten")]
    pub key_facts: usize,
    #[serde(default = "default_eight")]
    pub pricing_offers: usize,
    #[serde(default = "default_ten")]
    pub claims_proof: usize,
    #[serde(default = "default_eight")]
    pub faqs_policies: usize,
    #[serde(default = "default_eight")]
    pub trust_signals: usize,
    #[serde(default = "default_ten")]
    pub entities: usize,
    #[serde(default = "default_five")]
    pub risks_gaps: usize,
    /// Truncate parsed arrays to these limits instead of trusting the model.
    #[serde(default)]
    pub enforce: bool,
}

impl Default for BriefLimits {
    fn default() -> Self {
        Self {
            key_facts: 10,
            pricing_offers: 8,
            claims_proof: 10,
            faqs_policies: 8,
            trust_signals: 8,
            entities: 10,
            risks_gaps: 5,
            enforce: false,
        }
    }
}

fn default_ten() -> usize {
    10
}
fn default_eight() -> usize {
    8
}
fn default_five() -> usize {
    5
}

impl BriefLimits {
    /// `(field, limit)` pairs in the order they appear in a brief.
    pub fn fields(&self) -> [(&'static str, usize); 7] {
        [
            ("key_facts", self.key_facts),
            ("pricing_offers", self.pricing_offers),
            ("claims_proof", self.claims_proof),
            ("faqs_policies", self.faqs_policies),
            ("trust_signals", self.trust_signals),
            ("entities", self.entities),
            ("risks_gaps", self.risks_gaps),
        ]
    }
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Apply `SITEBRIEF_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (env-like key → value).
    ///
    /// Numeric values that do not parse or are not positive are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let budget = &mut self.budget;

        override_positive(&lookup, "SITEBRIEF_CRAWL_LIMIT", &mut self.crawl.page_limit);
        override_positive(
            &lookup,
            "SITEBRIEF_MAX_PAGINATION_REQUESTS",
            &mut budget.max_pagination_requests,
        );
        override_positive(
            &lookup,
            "SITEBRIEF_MAX_COLLECTED_PAGES",
            &mut budget.max_collected_pages,
        );
        override_positive(
            &lookup,
            "SITEBRIEF_MAX_SELECTED_PAGES",
            &mut budget.max_selected_pages,
        );
        override_positive(&lookup, "SITEBRIEF_MAX_CHARS_PER_PAGE", &mut budget.max_chars_per_page);
        override_positive(&lookup, "SITEBRIEF_MAX_TOTAL_CHARS", &mut budget.max_total_chars);
        override_positive(&lookup, "SITEBRIEF_CRAWL_TIMEOUT_MS", &mut budget.crawl_timeout_ms);
        override_positive(
            &lookup,
            "SITEBRIEF_CRAWL_RETRY_BASE_DELAY_MS",
            &mut budget.crawl_retry_base_delay_ms,
        );
        override_positive(
            &lookup,
            "SITEBRIEF_COMPLETION_TIMEOUT_MS",
            &mut budget.completion_timeout_ms,
        );
        override_positive(&lookup, "SITEBRIEF_REPAIR_TIMEOUT_MS", &mut budget.repair_timeout_ms);
        override_positive(
            &lookup,
            "SITEBRIEF_COMPLETION_MAX_TOKENS",
            &mut self.completion.max_tokens,
        );

        // Retries may legitimately be zero.
        if let Some(raw) = lookup("SITEBRIEF_CRAWL_RETRIES") {
            match raw.trim().parse::<u32>() {
                Ok(v) => budget.crawl_retries = v,
                Err(_) => warn!(key = "SITEBRIEF_CRAWL_RETRIES", value = %raw, "ignoring invalid override"),
            }
        }

        override_string(&lookup, "SITEBRIEF_MODEL", &mut self.completion.model);
        override_string(&lookup, "SITEBRIEF_CRAWL_BASE_URL", &mut self.crawl.base_url);
        override_string(
            &lookup,
            "SITEBRIEF_COMPLETION_ENDPOINT",
            &mut self.completion.endpoint,
        );
    }
}

fn override_positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => *slot = v,
        _ => warn!(key, value = %raw, "ignoring override: expected a positive integer"),
    }
}

fn override_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut String) {
    if let Some(raw) = lookup(key) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            *slot = trimmed.to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitebrief/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteBriefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitebrief/sitebrief.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk and apply environment overrides.
/// Returns defaults (plus overrides) if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    config.apply_env_overrides();
    config.budget = config.budget.sanitized();
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteBriefError::io(path, e))?;

    let mut config: AppConfig = toml::from_str(&content).map_err(|e| {
        SiteBriefError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.budget = config.budget.sanitized();
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteBriefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteBriefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteBriefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the env var named by the config.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(SiteBriefError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
