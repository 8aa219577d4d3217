//! Client for the hosted crawl service: start a job, read its status, and
//! follow the `next` cursor through paginated results.

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};
use url::Url;

use sitebrief_http::{Credentials, HttpClient, HttpOutcome, HttpRequest, RetryPolicy};
use sitebrief_shared::{CrawlPage, CrawlServiceConfig, Result, SiteBriefError};

/// Service label used in upstream errors.
const SERVICE: &str = "crawl";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Snapshot returned by `GET /crawl/{id}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatus {
    /// Job state; `"processing"` when the service omits it.
    pub status: String,
    pub completed: u64,
    pub total: u64,
    /// First batch of results (only populated once the job is done).
    pub pages: Vec<CrawlPage>,
    /// Cursor URL for the next batch.
    pub next: Option<String>,
}

impl CrawlStatus {
    /// Leniently read a status payload.
    pub fn from_value(data: &Value) -> Self {
        let batch = CrawlBatch::from_value(data);
        Self {
            status: data
                .get("status")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("processing")
                .to_string(),
            completed: data.get("completed").and_then(Value::as_u64).unwrap_or(0),
            total: data.get("total").and_then(Value::as_u64).unwrap_or(0),
            pages: batch.pages,
            next: batch.next,
        }
    }

    /// Whether the crawl has finished.
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// One page of results reached through a `next` cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlBatch {
    pub pages: Vec<CrawlPage>,
    pub next: Option<String>,
}

impl CrawlBatch {
    /// Leniently read a batch payload. Entries that are not page objects are skipped.
    pub fn from_value(data: &Value) -> Self {
        let raw = data.get("data").and_then(Value::as_array);
        let pages: Vec<CrawlPage> = raw
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let skipped = raw.map_or(0, |items| items.len() - pages.len());
        if skipped > 0 {
            debug!(skipped, "ignored malformed crawl page entries");
        }

        let next = data
            .get("next")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Self { pages, next }
    }
}

/// Everything gathered by following the pagination cursor.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    /// Collected pages, capped at the page bound.
    pub pages: Vec<CrawlPage>,
    /// Cursor requests made (the initial status call is not counted).
    pub requests: u32,
    /// More results existed but a request or page bound stopped collection.
    pub truncated: bool,
    /// Detail of the request that ended pagination early, if any.
    pub error: Option<Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Crawl-service client with injected base URL, key, and retry policy.
#[derive(Debug, Clone)]
pub struct CrawlClient {
    http: HttpClient,
    settings: CrawlServiceConfig,
    api_key: String,
    policy: RetryPolicy,
}

impl CrawlClient {
    pub fn new(
        http: HttpClient,
        settings: CrawlServiceConfig,
        api_key: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            http,
            settings,
            api_key: api_key.into(),
            policy,
        }
    }

    /// Page limit requested from the service for new jobs.
    pub fn page_limit(&self) -> u32 {
        self.settings.page_limit
    }

    fn credentials(&self) -> Credentials {
        Credentials::Bearer(self.api_key.clone())
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.settings.base_url.trim_end_matches('/'))
    }

    /// `{base}/crawl/{job_id}` with the id pushed as one percent-encoded
    /// path segment.
    fn job_endpoint(&self, job_id: &str) -> Result<String> {
        if matches!(job_id, "" | "." | "..") {
            return Err(SiteBriefError::validation(format!("Invalid crawl id: {job_id:?}")));
        }
        let mut url = Url::parse(&self.endpoint("crawl")).map_err(|e| {
            SiteBriefError::config(format!(
                "invalid crawl base URL '{}': {e}",
                self.settings.base_url
            ))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                SiteBriefError::config(format!(
                    "crawl base URL '{}' cannot have path segments",
                    self.settings.base_url
                ))
            })?
            .push(job_id);
        Ok(url.into())
    }

    /// Start a crawl job and return its id.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn start(&self, url: &Url) -> Result<String> {
        let payload = json!({
            "url": url.as_str(),
            "limit": self.settings.page_limit,
            "maxDiscoveryDepth": self.settings.max_discovery_depth,
            "crawlEntireDomain": self.settings.crawl_entire_domain,
            "allowExternalLinks": false,
            "allowSubdomains": false,
            "ignoreQueryParameters": true,
            "sitemap": "include",
            "scrapeOptions": {
                "formats": ["markdown", "html"],
                "onlyMainContent": true,
            },
        });

        let request = HttpRequest::post(self.endpoint("crawl"), payload, self.credentials());
        let outcome = self.http.send(&request, &self.policy).await;

        let job_id = outcome
            .data
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from);

        match job_id {
            Some(id) if outcome.ok => {
                info!(job_id = %id, limit = self.settings.page_limit, "crawl started");
                Ok(id)
            }
            _ => Err(upstream_error("Crawl request failed.", outcome)),
        }
    }

    /// Fetch the current status (and first result batch) of a job.
    #[instrument(skip_all, fields(job_id = %job_id))]
    pub async fn status(&self, job_id: &str) -> Result<CrawlStatus> {
        let request = HttpRequest::get(self.job_endpoint(job_id)?, self.credentials());
        let outcome = self.http.send(&request, &self.policy).await;

        if !outcome.ok {
            return Err(upstream_error("Crawl status failed.", outcome));
        }

        let status = CrawlStatus::from_value(&outcome.data);
        debug!(
            status = %status.status,
            completed = status.completed,
            total = status.total,
            pages = status.pages.len(),
            "crawl status fetched"
        );
        Ok(status)
    }

    /// Fetch the batch behind a `next` cursor.
    ///
    /// Returns the failed outcome unchanged so the caller can record it.
    pub async fn next_batch(&self, cursor: &str) -> std::result::Result<CrawlBatch, HttpOutcome> {
        let request = HttpRequest::get(cursor, self.credentials());
        let outcome = self.http.send(&request, &self.policy).await;
        if outcome.ok {
            Ok(CrawlBatch::from_value(&outcome.data))
        } else {
            Err(outcome)
        }
    }

    /// Follow `first.next` until the cursor runs out or a bound is hit.
    ///
    /// A failing cursor request ends pagination without failing the caller:
    /// pages gathered so far are kept and the failure is reported in
    /// [`Pagination::error`].
    #[instrument(skip_all, fields(max_requests = max_requests, max_pages = max_pages))]
    pub async fn paginate(&self, first: CrawlStatus, max_requests: u32, max_pages: usize) -> Pagination {
        let mut pages = first.pages;
        let mut next = first.next;
        let mut requests = 0u32;
        let mut truncated = false;
        let mut error = None;

        while let Some(cursor) = next.take() {
            if pages.len() >= max_pages || requests >= max_requests {
                truncated = true;
                break;
            }

            requests += 1;
            match self.next_batch(&cursor).await {
                Ok(batch) => {
                    debug!(request = requests, batch = batch.pages.len(), "pagination batch fetched");
                    pages.extend(batch.pages);
                    next = batch.next;
                }
                Err(outcome) => {
                    warn!(
                        request = requests,
                        status = outcome.status,
                        attempts = outcome.attempts,
                        "pagination request failed, continuing with collected pages"
                    );
                    error = Some(json!({
                        "status": outcome.status,
                        "attempts": outcome.attempts,
                        "detail": outcome.data,
                    }));
                }
            }
        }

        if pages.len() > max_pages {
            pages.truncate(max_pages);
            truncated = true;
        }

        info!(pages = pages.len(), requests, truncated, failed = error.is_some(), "pagination complete");

        Pagination {
            pages,
            requests,
            truncated,
            error,
        }
    }
}

/// Convert a failed outcome into an upstream error carrying its detail.
fn upstream_error(message: &str, outcome: HttpOutcome) -> SiteBriefError {
    SiteBriefError::Upstream {
        service: SERVICE,
        message: message.to_string(),
        status: outcome.status,
        attempts: outcome.attempts,
        detail: outcome.data,
    }
}
