//! Brief pipeline: crawl status → pagination → selection → prompt →
//! completion → parse/repair → response.
//!
//! Each invocation runs sequentially on its own page list and counters.
//! Nothing is shared between invocations apart from the HTTP client.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{Instrument, debug, info, info_span, instrument, warn};
use uuid::Uuid;

use sitebrief_crawler::{CrawlClient, parse_target};
use sitebrief_http::{HttpClient, RetryPolicy};
use sitebrief_ranking::{build_sources, select_pages};
use sitebrief_shared::{
    AppConfig, Brief, BriefLimits, CompletionConfig, CrawlServiceConfig, RequestBudget, Result,
    SiteBriefError, resolve_api_key, truncate_chars,
};

use crate::completion::{CompletionClient, CompletionRequest};
use crate::prompt::build_prompt;
use crate::repair::{ParseDecision, RAW_OUTPUT_LIMIT, RepairSettings, decide, repair_output};
use crate::response::{
    BriefMeta, BriefResponse, CompletedBrief, CrawlStarted, ProgressSnapshot, ReadySignal,
};

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Pipeline states, in the order a full run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PendingCrawl,
    Paginating,
    Selecting,
    Prompting,
    Completing,
    Parsing,
    Repairing,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingCrawl => "checking crawl status",
            Self::Paginating => "collecting pages",
            Self::Selecting => "selecting sources",
            Self::Prompting => "building prompt",
            Self::Completing => "waiting for completion",
            Self::Parsing => "parsing output",
            Self::Repairing => "repairing output",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, stage: Stage);
    /// Called once pagination has finished.
    fn pages_collected(&self, pages: usize, requests: u32);
    /// Called when the pipeline returns a response.
    fn done(&self, response: &BriefResponse);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn pages_collected(&self, _pages: usize, _requests: u32) {}
    fn done(&self, _response: &BriefResponse) {}
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the pipeline needs, injected at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub crawl: CrawlServiceConfig,
    pub completion: CompletionConfig,
    pub budget: RequestBudget,
    pub limits: BriefLimits,
    pub default_goal: String,
    pub crawl_api_key: String,
    pub completion_api_key: String,
}

impl PipelineConfig {
    /// Build from loaded configuration, reading API keys from the
    /// environment variables it names.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            crawl: config.crawl.clone(),
            completion: config.completion.clone(),
            budget: config.budget.clone(),
            limits: config.limits.clone(),
            default_goal: config.defaults.goal.clone(),
            crawl_api_key: resolve_api_key(&config.crawl.api_key_env)?,
            completion_api_key: resolve_api_key(&config.completion.api_key_env)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The brief pipeline and its two entry points.
#[derive(Debug, Clone)]
pub struct BriefPipeline {
    crawl: CrawlClient,
    completion: CompletionClient,
    completion_settings: CompletionConfig,
    budget: RequestBudget,
    limits: BriefLimits,
    default_goal: String,
}

impl BriefPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let http = HttpClient::new()?;
        let budget = config.budget.sanitized();
        let crawl_policy = RetryPolicy::from_millis(
            budget.crawl_timeout_ms,
            budget.crawl_retries,
            budget.crawl_retry_base_delay_ms,
        );

        Ok(Self {
            crawl: CrawlClient::new(http.clone(), config.crawl, config.crawl_api_key, crawl_policy),
            completion: CompletionClient::new(
                http,
                config.completion.clone(),
                config.completion_api_key,
            ),
            completion_settings: config.completion,
            budget,
            limits: config.limits,
            default_goal: config.default_goal,
        })
    }

    /// The trimmed goal, or the configured default when blank.
    pub fn resolve_goal(&self, goal: Option<&str>) -> String {
        goal.map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(self.default_goal.as_str())
            .to_string()
    }

    /// Validate `url` and start a crawl job for it.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn start_crawl(&self, url: &str, goal: Option<&str>) -> Result<CrawlStarted> {
        let target = parse_target(url)?;
        let goal = self.resolve_goal(goal);
        let job_id = self.crawl.start(&target).await?;

        Ok(CrawlStarted {
            job_id,
            goal,
            limit: self.crawl.page_limit(),
        })
    }

    /// Report crawl progress, or, once the crawl has completed and
    /// `extract` is set, produce the brief.
    pub async fn get_status_or_brief(
        &self,
        job_id: &str,
        goal: Option<&str>,
        extract: bool,
        progress: &dyn ProgressReporter,
    ) -> Result<BriefResponse> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(SiteBriefError::validation("Missing crawl id."));
        }

        let run_id = Uuid::now_v7();
        let span = info_span!("brief", %run_id, job_id);
        let result = self
            .run(job_id, &self.resolve_goal(goal), extract, run_id, progress)
            .instrument(span)
            .await;

        match &result {
            Ok(response) => {
                debug!(%run_id, job_id, kind = response.kind(), "brief pipeline returned");
                progress.done(response);
            }
            Err(e) => {
                progress.stage(Stage::Failed);
                warn!(%run_id, job_id, timed_out = e.is_timeout(), error = %e, "brief pipeline failed");
            }
        }
        result
    }

    async fn run(
        &self,
        job_id: &str,
        goal: &str,
        extract: bool,
        run_id: Uuid,
        progress: &dyn ProgressReporter,
    ) -> Result<BriefResponse> {
        // --- Crawl status ---
        progress.stage(Stage::PendingCrawl);
        let status = self.crawl.status(job_id).await?;

        if !status.is_completed() {
            info!(status = %status.status, completed = status.completed, total = status.total, "crawl in progress");
            return Ok(BriefResponse::Progress(ProgressSnapshot {
                status: status.status,
                completed: status.completed,
                total: status.total,
            }));
        }

        if !extract {
            return Ok(BriefResponse::Ready(ReadySignal {
                status: "completed",
                ready: true,
                completed: status.completed,
                total: status.total,
            }));
        }

        // --- Pagination ---
        progress.stage(Stage::Paginating);
        let pagination = self
            .crawl
            .paginate(
                status,
                self.budget.max_pagination_requests,
                self.budget.max_collected_pages,
            )
            .await;
        progress.pages_collected(pagination.pages.len(), pagination.requests);

        let total_pages = pagination.pages.len();
        let mut meta = BriefMeta {
            run_id: run_id.to_string(),
            pages_used: 0,
            total_pages,
            pagination_truncated: pagination.truncated,
            pagination_requests: pagination.requests,
            pagination_error: pagination.error,
            json_repaired: false,
            schema_conformant: true,
            stop_reason: None,
            usage: None,
            model: self.completion.model().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        };

        // --- Selection ---
        progress.stage(Stage::Selecting);
        let selected = select_pages(pagination.pages, self.budget.max_selected_pages);
        let sources = build_sources(&selected, &self.budget);
        meta.pages_used = sources.len();

        info!(
            total_pages,
            selected = selected.len(),
            sources = sources.len(),
            "selection complete"
        );

        if sources.is_empty() {
            info!("no usable sources, returning empty brief");
            progress.stage(Stage::Done);
            return Ok(completed(brief_value(&Brief::not_found()), meta));
        }

        // --- Prompt + completion ---
        progress.stage(Stage::Prompting);
        let prompt = build_prompt(goal, &sources, &self.limits);

        progress.stage(Stage::Completing);
        let completion = self
            .completion
            .complete(CompletionRequest {
                prompt: &prompt,
                max_tokens: self.completion_settings.max_tokens,
                temperature: self.completion_settings.temperature,
                timeout_ms: self.budget.completion_timeout_ms,
            })
            .await?;
        meta.stop_reason = completion.stop_reason.clone();
        meta.usage = completion.usage.clone();

        // --- Parse, repairing at most once ---
        progress.stage(Stage::Parsing);
        let parsed = match decide(&completion.text) {
            ParseDecision::Accepted(map) => map,
            ParseDecision::NeedsRepair => {
                progress.stage(Stage::Repairing);
                let settings = RepairSettings {
                    max_tokens: self.completion_settings.repair_max_tokens,
                    timeout_ms: self.budget.repair_timeout_ms,
                };
                match repair_output(&self.completion, &completion.text, settings).await {
                    Ok(map) => {
                        meta.json_repaired = true;
                        map
                    }
                    Err(diagnostics) => {
                        return Err(SiteBriefError::MalformedOutput {
                            message: "Model returned invalid JSON.".into(),
                            raw: truncate_chars(&completion.text, RAW_OUTPUT_LIMIT).to_string(),
                            repair: diagnostics,
                        });
                    }
                }
            }
        };

        let mut result = Value::Object(parsed);
        meta.schema_conformant = serde_json::from_value::<Brief>(result.clone()).is_ok();
        if self.limits.enforce {
            enforce_limits(&mut result, &self.limits);
        }

        info!(
            pages_used = meta.pages_used,
            json_repaired = meta.json_repaired,
            schema_conformant = meta.schema_conformant,
            "brief complete"
        );
        progress.stage(Stage::Done);

        Ok(completed(result, meta))
    }
}

fn completed(result: Value, meta: BriefMeta) -> BriefResponse {
    BriefResponse::Completed(CompletedBrief {
        status: "completed",
        result,
        meta,
    })
}

fn brief_value(brief: &Brief) -> Value {
    serde_json::to_value(brief).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Truncate each limited array field of `result` to its limit.
pub fn enforce_limits(result: &mut Value, limits: &BriefLimits) {
    for (field, max) in limits.fields() {
        if let Some(items) = result.get_mut(field).and_then(Value::as_array_mut) {
            items.truncate(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::response::respond;

    const MESSAGES: &str = "/v1/messages";

    fn config_for(server: &MockServer) -> PipelineConfig {
        PipelineConfig {
            crawl: CrawlServiceConfig {
                base_url: server.uri(),
                ..CrawlServiceConfig::default()
            },
            completion: CompletionConfig {
                endpoint: format!("{}{MESSAGES}", server.uri()),
                ..CompletionConfig::default()
            },
            budget: RequestBudget {
                crawl_retries: 0,
                crawl_retry_base_delay_ms: 1,
                crawl_timeout_ms: 2_000,
                completion_timeout_ms: 2_000,
                repair_timeout_ms: 2_000,
                ..RequestBudget::default()
            },
            limits: BriefLimits::default(),
            default_goal: "Competitor Snapshot".into(),
            crawl_api_key: "fc-test".into(),
            completion_api_key: "sk-test".into(),
        }
    }

    fn pipeline_for(server: &MockServer) -> BriefPipeline {
        BriefPipeline::new(config_for(server)).unwrap()
    }

    fn page(url: &str, len: usize) -> Value {
        json!({"markdown": "w ".repeat(len / 2), "metadata": {"sourceURL": url, "title": url}})
    }

    fn message(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 100, "output_tokens": 20},
        }))
    }

    async fn mount_status(server: &MockServer, body: Value) {
        Mock::given(method("GET"))
            .and(path("/crawl/job_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn expect_no_completion(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(message("{}"))
            .expect(0)
            .mount(server)
            .await;
    }

    fn unwrap_completed(response: BriefResponse) -> CompletedBrief {
        match response {
            BriefResponse::Completed(brief) => brief,
            other => panic!("expected completed brief, got {other:?}"),
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        stages: Mutex<Vec<Stage>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }
        fn pages_collected(&self, _pages: usize, _requests: u32) {}
        fn done(&self, _response: &BriefResponse) {}
    }

    #[test]
    fn blank_goal_uses_default() {
        let config = PipelineConfig {
            crawl: CrawlServiceConfig::default(),
            completion: CompletionConfig::default(),
            budget: RequestBudget::default(),
            limits: BriefLimits::default(),
            default_goal: "Competitor Snapshot".into(),
            crawl_api_key: String::new(),
            completion_api_key: String::new(),
        };
        let pipeline = BriefPipeline::new(config).unwrap();
        assert_eq!(pipeline.resolve_goal(None), "Competitor Snapshot");
        assert_eq!(pipeline.resolve_goal(Some("   ")), "Competitor Snapshot");
        assert_eq!(pipeline.resolve_goal(Some(" Pricing ")), "Pricing");
    }

    #[test]
    fn enforce_limits_truncates_arrays() {
        let mut result = json!({
            "title": "Acme",
            "key_facts": [1, 2, 3, 4],
            "risks_gaps": ["a", "b", "c"],
            "sources": [1, 2, 3, 4, 5],
        });
        let limits = BriefLimits {
            key_facts: 2,
            risks_gaps: 1,
            ..BriefLimits::default()
        };
        enforce_limits(&mut result, &limits);
        assert_eq!(result["key_facts"], json!([1, 2]));
        assert_eq!(result["risks_gaps"], json!(["a"]));
        assert_eq!(result["sources"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn start_crawl_rejects_invalid_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
            .expect(0)
            .mount(&server)
            .await;

        let err = pipeline_for(&server)
            .start_crawl("ftp://example.com", None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn start_crawl_returns_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crawl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let started = pipeline_for(&server)
            .start_crawl("acme.com", Some(""))
            .await
            .unwrap();
        assert_eq!(started.job_id, "job_1");
        assert_eq!(started.goal, "Competitor Snapshot");
        assert_eq!(started.limit, 50);
    }

    #[tokio::test]
    async fn empty_job_id_is_rejected() {
        let server = MockServer::start().await;
        let err = pipeline_for(&server)
            .get_status_or_brief("  ", None, true, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteBriefError::Validation { .. }));
    }

    #[tokio::test]
    async fn processing_crawl_returns_progress_without_completion() {
        let server = MockServer::start().await;
        mount_status(&server, json!({"status": "scraping", "completed": 3, "total": 10})).await;
        expect_no_completion(&server).await;

        let response = pipeline_for(&server)
            .get_status_or_brief("job_1", None, true, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(
            response,
            BriefResponse::Progress(ProgressSnapshot {
                status: "scraping".into(),
                completed: 3,
                total: 10,
            })
        );
    }

    #[tokio::test]
    async fn missing_status_defaults_to_processing() {
        let server = MockServer::start().await;
        mount_status(&server, json!({})).await;
        expect_no_completion(&server).await;

        let response = pipeline_for(&server)
            .get_status_or_brief("job_1", None, true, &SilentProgress)
            .await
            .unwrap();
        let body = respond(Ok(response)).body;
        assert_eq!(body, json!({"status": "processing", "completed": 0, "total": 0}));
    }

    #[tokio::test]
    async fn completed_without_extract_is_ready() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({"status": "completed", "completed": 4, "total": 4, "data": [page("https://acme.com/", 400)]}),
        )
        .await;
        expect_no_completion(&server).await;

        let response = pipeline_for(&server)
            .get_status_or_brief("job_1", None, false, &SilentProgress)
            .await
            .unwrap();
        let body = respond(Ok(response)).body;
        assert_eq!(
            body,
            json!({"status": "completed", "ready": true, "completed": 4, "total": 4})
        );
    }

    #[tokio::test]
    async fn no_content_returns_not_found_brief_without_completion() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({
                "status": "completed",
                "data": [
                    {"markdown": "   ", "metadata": {"sourceURL": "https://acme.com/"}},
                    {"metadata": {"sourceURL": "https://acme.com/pricing"}},
                ],
            }),
        )
        .await;
        expect_no_completion(&server).await;

        let brief = unwrap_completed(
            pipeline_for(&server)
                .get_status_or_brief("job_1", None, true, &SilentProgress)
                .await
                .unwrap(),
        );
        assert_eq!(brief.result["title"], "Not found");
        assert_eq!(brief.result["risks_gaps"], json!(["Not found"]));
        assert_eq!(brief.meta.pages_used, 0);
        assert_eq!(brief.meta.total_pages, 2);
        assert!(!brief.meta.json_repaired);
    }

    #[tokio::test]
    async fn full_run_paginates_and_parses() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({
                "status": "completed",
                "completed": 3,
                "total": 3,
                "data": [page("https://acme.com/", 600)],
                "next": format!("{}/crawl/job_1/next", server.uri()),
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/crawl/job_1/next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [page("https://acme.com/pricing", 2_000), page("https://acme.com/faq", 800)],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(message(
                "```json\n{\"title\": \"Acme\", \"one_liner\": \"Widgets\", \"key_facts\": [],}\n```",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let progress = RecordingProgress::default();
        let brief = unwrap_completed(
            pipeline_for(&server)
                .get_status_or_brief("job_1", Some("Pricing"), true, &progress)
                .await
                .unwrap(),
        );

        assert_eq!(brief.result["title"], "Acme");
        assert_eq!(brief.meta.pages_used, 3);
        assert_eq!(brief.meta.total_pages, 3);
        assert_eq!(brief.meta.pagination_requests, 1);
        assert!(!brief.meta.pagination_truncated);
        assert!(brief.meta.pagination_error.is_none());
        assert!(!brief.meta.json_repaired);
        assert!(brief.meta.schema_conformant);
        assert_eq!(brief.meta.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(brief.meta.usage.as_ref().unwrap()["output_tokens"], 20);
        assert_eq!(brief.meta.model, "claude-sonnet-4-20250514");

        let stages = progress.stages.lock().unwrap().clone();
        assert_eq!(
            stages,
            [
                Stage::PendingCrawl,
                Stage::Paginating,
                Stage::Selecting,
                Stage::Prompting,
                Stage::Completing,
                Stage::Parsing,
                Stage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn pagination_failure_is_reported_not_fatal() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({
                "status": "completed",
                "data": [page("https://acme.com/", 600)],
                "next": format!("{}/crawl/job_1/next", server.uri()),
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/crawl/job_1/next"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "down"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(message("{\"title\": \"Acme\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let brief = unwrap_completed(
            pipeline_for(&server)
                .get_status_or_brief("job_1", None, true, &SilentProgress)
                .await
                .unwrap(),
        );
        assert_eq!(brief.meta.pages_used, 1);
        let error = brief.meta.pagination_error.unwrap();
        assert_eq!(error["status"], 500);
        assert_eq!(error["detail"]["error"], "down");
    }

    #[tokio::test]
    async fn malformed_output_is_repaired_once() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({"status": "completed", "data": [page("https://acme.com/pricing", 1_000)]}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(message("Title: Acme, sells widgets"))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(message("{\"title\": \"Acme\", \"one_liner\": \"Sells widgets\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let brief = unwrap_completed(
            pipeline_for(&server)
                .get_status_or_brief("job_1", None, true, &SilentProgress)
                .await
                .unwrap(),
        );
        assert!(brief.meta.json_repaired);
        assert_eq!(brief.result["one_liner"], "Sells widgets");
    }

    #[tokio::test]
    async fn failed_repair_reports_raw_and_diagnostics() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({"status": "completed", "data": [page("https://acme.com/", 1_000)]}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(message("not json"))
            .expect(2)
            .mount(&server)
            .await;

        let result = pipeline_for(&server)
            .get_status_or_brief("job_1", None, true, &SilentProgress)
            .await;
        let response = respond(result);
        assert_eq!(response.status, 502);
        assert_eq!(response.body["status"], "failed");
        assert_eq!(response.body["raw"], "not json");
        assert_eq!(response.body["repair"]["attempted"], true);
    }

    #[tokio::test]
    async fn completion_failure_is_upstream_error() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({"status": "completed", "data": [page("https://acme.com/", 1_000)]}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad key"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = respond(
            pipeline_for(&server)
                .get_status_or_brief("job_1", None, true, &SilentProgress)
                .await,
        );
        assert_eq!(response.status, 502);
        assert_eq!(response.body["service"], "completion");
        assert_eq!(response.body["upstream_status"], 401);
        assert_eq!(response.body["detail"]["error"], "bad key");
    }

    #[tokio::test]
    async fn crawl_status_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "no job"})))
            .mount(&server)
            .await;
        expect_no_completion(&server).await;

        let response = respond(
            pipeline_for(&server)
                .get_status_or_brief("job_1", None, true, &SilentProgress)
                .await,
        );
        assert_eq!(response.status, 502);
        assert_eq!(response.body["service"], "crawl");
        assert_eq!(response.body["attempts"], 1);
    }

    #[tokio::test]
    async fn enforced_limits_truncate_result() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            json!({"status": "completed", "data": [page("https://acme.com/", 1_000)]}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(MESSAGES))
            .respond_with(message("{\"risks_gaps\": [\"a\", \"b\", \"c\"]}"))
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.limits = BriefLimits {
            risks_gaps: 1,
            enforce: true,
            ..BriefLimits::default()
        };
        let brief = unwrap_completed(
            BriefPipeline::new(config)
                .unwrap()
                .get_status_or_brief("job_1", None, true, &SilentProgress)
                .await
                .unwrap(),
        );
        assert_eq!(brief.result["risks_gaps"], json!(["a"]));
    }
}
