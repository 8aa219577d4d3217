//! Single-shot calls to the text completion service.
//!
//! Completions are never retried here: a failed call is returned to the
//! pipeline, which decides whether a repair pass is worth it.

use serde_json::{Value, json};
use tracing::{debug, instrument};

use sitebrief_http::{Credentials, HttpClient, HttpRequest, RetryPolicy};
use sitebrief_shared::{CompletionConfig, Result, SiteBriefError};

/// Service label used in upstream errors.
const SERVICE: &str = "completion";

/// Parameters for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_ms: u64,
}

/// Text and diagnostics from a successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Text fragments joined by newlines and trimmed.
    pub text: String,
    pub stop_reason: Option<String>,
    pub usage: Option<Value>,
}

/// Client for the messages endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: HttpClient,
    settings: CompletionConfig,
    api_key: String,
}

impl CompletionClient {
    pub fn new(http: HttpClient, settings: CompletionConfig, api_key: impl Into<String>) -> Self {
        Self {
            http,
            settings,
            api_key: api_key.into(),
        }
    }

    /// Model name sent with every request.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Send `request.prompt` as a single user message.
    #[instrument(skip_all, fields(model = %self.settings.model, max_tokens = request.max_tokens))]
    pub async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion> {
        let body = json!({
            "model": self.settings.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let http_request = HttpRequest::post(
            self.settings.endpoint.as_str(),
            body,
            Credentials::Header {
                name: "x-api-key",
                value: self.api_key.clone(),
            },
        )
        .header("anthropic-version", self.settings.api_version.as_str());

        let policy = RetryPolicy::single_attempt(request.timeout_ms);
        let outcome = self.http.send(&http_request, &policy).await;

        if !outcome.ok {
            let message = if outcome.timed_out {
                "Completion request timed out."
            } else {
                "Completion request failed."
            };
            return Err(SiteBriefError::Upstream {
                service: SERVICE,
                message: message.to_string(),
                status: outcome.status,
                attempts: outcome.attempts,
                detail: outcome.data,
            });
        }

        let completion = Completion {
            text: extract_text(&outcome.data),
            stop_reason: outcome
                .data
                .get("stop_reason")
                .and_then(Value::as_str)
                .map(String::from),
            usage: outcome.data.get("usage").filter(|u| u.is_object()).cloned(),
        };

        debug!(
            chars = completion.text.len(),
            stop_reason = completion.stop_reason.as_deref().unwrap_or("none"),
            "completion received"
        );
        Ok(completion)
    }
}

/// Join the text of every text-bearing content item. Other items count as
/// empty strings.
pub fn extract_text(data: &Value) -> String {
    data.get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| item.get("text").and_then(Value::as_str).unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> CompletionClient {
        let settings = CompletionConfig {
            endpoint: format!("{}/v1/messages", server.uri()),
            ..CompletionConfig::default()
        };
        CompletionClient::new(HttpClient::new().unwrap(), settings, "sk-test")
    }

    fn request(prompt: &str) -> CompletionRequest<'_> {
        CompletionRequest {
            prompt,
            max_tokens: 512,
            temperature: 0.2,
            timeout_ms: 2_000,
        }
    }

    #[test]
    fn extract_text_skips_non_text_items() {
        let data = json!({
            "content": [
                {"type": "text", "text": "  {\"a\":"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "1}  "},
            ]
        });
        assert_eq!(extract_text(&data), "{\"a\":\n\n1}");
        assert_eq!(extract_text(&json!({})), "");
    }

    #[tokio::test]
    async fn sends_single_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 512,
                "messages": [{"role": "user", "content": "hello"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "{\"ok\":true}"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 10, "output_tokens": 4},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client_for(&server).complete(request("hello")).await.unwrap();
        assert_eq!(completion.text, "{\"ok\":true}");
        assert_eq!(completion.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(completion.usage.unwrap()["output_tokens"], 4);
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({"error": "overloaded"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).complete(request("hi")).await.unwrap_err();
        match err {
            SiteBriefError::Upstream {
                service,
                status,
                attempts,
                detail,
                ..
            } => {
                assert_eq!(service, "completion");
                assert_eq!(status, 529);
                assert_eq!(attempts, 1);
                assert_eq!(detail["error"], "overloaded");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_carries_configured_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": []}))
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest {
                timeout_ms: 50,
                ..request("hi")
            })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
    }
}
