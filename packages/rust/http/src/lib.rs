//! Resilient JSON request executor for the crawl and completion services.
//!
//! [`HttpClient::send`] never fails: every outcome, including timeouts and
//! transport errors, is reported as an [`HttpOutcome`] with the number of
//! attempts made and a JSON `data` payload describing the result.

mod retry;

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use sitebrief_shared::{Result, SiteBriefError, truncate_chars};

pub use reqwest::Method;
pub use retry::{MAX_BACKOFF, RetryPolicy, is_retryable_status};

/// User-Agent string for upstream requests.
const USER_AGENT: &str = concat!("SiteBrief/", env!("CARGO_PKG_VERSION"));

/// Non-JSON bodies are kept up to this many characters under `_raw`.
pub const RAW_BODY_LIMIT: usize = 2_000;

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// How a request authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// A vendor-specific key header such as `x-api-key`.
    Header { name: &'static str, value: String },
}

/// One logical request; retried attempts reuse it unchanged.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub credentials: Credentials,
    pub headers: Vec<(&'static str, String)>,
}

impl HttpRequest {
    /// A bodiless GET.
    pub fn get(url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
            credentials,
            headers: Vec::new(),
        }
    }

    /// A POST carrying a JSON body.
    pub fn post(url: impl Into<String>, body: Value, credentials: Credentials) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
            credentials,
            headers: Vec::new(),
        }
    }

    /// Add an extra header.
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Result of a request after all attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpOutcome {
    /// True only for a 2xx response.
    pub ok: bool,
    /// HTTP status of the last response, 0 if none was received.
    pub status: u16,
    /// Attempts made, 1 on first-try success.
    pub attempts: u32,
    /// Parsed body, `{"_raw": ..}` fallback, or an error description.
    pub data: Value,
    /// The last attempt hit the per-attempt timeout.
    #[serde(skip)]
    pub timed_out: bool,
}

/// What a single attempt produced.
enum Attempt {
    Response { status: u16, body: String },
    TimedOut,
    Failed { detail: String, retryable: bool },
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Shared HTTP client; cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client with the SiteBrief user agent.
    ///
    /// No client-level timeout is set; each call enforces its own.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SiteBriefError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Execute `request` under `policy`, retrying retryable failures with
    /// exponential backoff.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: &HttpRequest, policy: &RetryPolicy) -> HttpOutcome {
        let max_attempts = policy.max_attempts();
        let mut attempt = 1;

        loop {
            let (outcome, retryable) = match self.attempt(request, policy.timeout).await {
                Attempt::Response { status, body } => {
                    let data = parse_body(&body);
                    let ok = (200..300).contains(&status);
                    let outcome = HttpOutcome {
                        ok,
                        status,
                        attempts: attempt,
                        data,
                        timed_out: false,
                    };
                    (outcome, !ok && is_retryable_status(status))
                }
                Attempt::TimedOut => (
                    HttpOutcome {
                        ok: false,
                        status: 0,
                        attempts: attempt,
                        data: json!({
                            "error": "Request timed out.",
                            "detail": format!("no response within {} ms", policy.timeout_ms()),
                            "timeout_ms": policy.timeout_ms(),
                        }),
                        timed_out: true,
                    },
                    true,
                ),
                Attempt::Failed { detail, retryable } => (
                    HttpOutcome {
                        ok: false,
                        status: 0,
                        attempts: attempt,
                        data: json!({
                            "error": "Request failed.",
                            "detail": detail,
                        }),
                        timed_out: false,
                    },
                    retryable,
                ),
            };

            if outcome.ok || !retryable || attempt >= max_attempts {
                debug!(status = outcome.status, attempts = attempt, ok = outcome.ok, "request finished");
                return outcome;
            }

            let delay = policy.delay_for(attempt);
            warn!(
                status = outcome.status,
                attempt,
                timed_out = outcome.timed_out,
                delay_ms = delay.as_millis() as u64,
                "retryable failure, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One attempt, bounded by `timeout` from send through body read.
    async fn attempt(&self, request: &HttpRequest, timeout: Duration) -> Attempt {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str());

        builder = match &request.credentials {
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::Header { name, value } => builder.header(*name, value),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            // Sets `Content-Type: application/json`.
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok((status, body))) => Attempt::Response { status, body },
            Ok(Err(e)) => Attempt::Failed {
                detail: e.to_string(),
                retryable: !e.is_builder(),
            },
            Err(_) => Attempt::TimedOut,
        }
    }
}

/// Parse a response body as JSON, falling back to `{"_raw": <prefix>}`.
pub fn parse_body(text: &str) -> Value {
    serde_json::from_str(text)
        .unwrap_or_else(|_| json!({ "_raw": truncate_chars(text, RAW_BODY_LIMIT) }))
}
