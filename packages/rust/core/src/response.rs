//! Response envelopes returned by the pipeline entry points.

use serde::Serialize;
use serde_json::{Value, json};

use sitebrief_shared::Result;

/// Returned by `start_crawl`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlStarted {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub goal: String,
    pub limit: u32,
}

/// Crawl still running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub status: String,
    pub completed: u64,
    pub total: u64,
}

/// Crawl finished, extraction not requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadySignal {
    pub status: &'static str,
    pub ready: bool,
    pub completed: u64,
    pub total: u64,
}

/// Diagnostics attached to a finished brief.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BriefMeta {
    pub run_id: String,
    pub pages_used: usize,
    pub total_pages: usize,
    pub pagination_truncated: bool,
    pub pagination_requests: u32,
    pub pagination_error: Option<Value>,
    pub json_repaired: bool,
    /// Whether the result also deserializes as a typed brief.
    pub schema_conformant: bool,
    pub stop_reason: Option<String>,
    pub usage: Option<Value>,
    pub model: String,
    pub generated_at: String,
}

/// A finished brief.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedBrief {
    pub status: &'static str,
    pub result: Value,
    pub meta: BriefMeta,
}

/// Outcome of `get_status_or_brief`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BriefResponse {
    Progress(ProgressSnapshot),
    Ready(ReadySignal),
    Completed(CompletedBrief),
}

impl BriefResponse {
    /// Short label for logs and progress output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Ready(_) => "ready",
            Self::Completed(_) => "completed",
        }
    }
}

/// Status code and JSON body for a request/response boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Map any entry-point outcome to a response; failures become structured
/// bodies instead of errors.
pub fn respond<T: Serialize>(result: Result<T>) -> ApiResponse {
    match result {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(body) => ApiResponse { status: 200, body },
            Err(e) => ApiResponse {
                status: 500,
                body: json!({
                    "status": "failed",
                    "error": "Failed to serialize response.",
                    "detail": e.to_string(),
                }),
            },
        },
        Err(e) => ApiResponse {
            status: e.http_status(),
            body: e.to_body(),
        },
    }
}

#[cfg(test)]
mod tests {
    use sitebrief_shared::SiteBriefError;

    use super::*;

    #[test]
    fn progress_serializes_flat() {
        let response = respond(Ok(BriefResponse::Progress(ProgressSnapshot {
            status: "scraping".into(),
            completed: 3,
            total: 10,
        })));
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            json!({"status": "scraping", "completed": 3, "total": 10})
        );
    }

    #[test]
    fn kind_labels_each_variant() {
        let progress = BriefResponse::Progress(ProgressSnapshot {
            status: "scraping".into(),
            completed: 0,
            total: 0,
        });
        let ready = BriefResponse::Ready(ReadySignal {
            status: "completed",
            ready: true,
            completed: 4,
            total: 4,
        });
        assert_eq!(progress.kind(), "progress");
        assert_eq!(ready.kind(), "ready");
    }

    #[test]
    fn crawl_started_uses_job_id_key() {
        let response = respond(Ok(CrawlStarted {
            job_id: "job_1".into(),
            goal: "Competitor Snapshot".into(),
            limit: 50,
        }));
        assert_eq!(response.body["jobId"], "job_1");
        assert!(response.is_success());
    }

    #[test]
    fn errors_map_to_status_and_body() {
        let response = respond::<CrawlStarted>(Err(SiteBriefError::validation("Missing url.")));
        assert_eq!(response.status, 400);
        assert_eq!(response.body["status"], "failed");
        assert_eq!(response.body["error"], "Missing url.");
        assert!(!response.is_success());
    }
}
