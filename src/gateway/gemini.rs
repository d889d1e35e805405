//! Gemini `generateContent` client.
//!
//! Translates [`GenerateOptions`] into request fields:
//!
//! | Option | Request field |
//! |--------|---------------|
//! | every call | `systemInstruction` = [`SYSTEM_DIRECTIVE`] |
//! | `structured` | `generationConfig.responseMimeType = application/json`, `responseSchema` |
//! | `web_tool` | `tools = [{google_search}, {url_context}]` |
//!
//! HTTP 429 and the `RESOURCE_EXHAUSTED` status are reported as
//! [`GatewayError::RateLimited`]; retrying is left to
//! [`super::retry::RetryGenerate`].

use super::{Generate, GenerateOptions, SYSTEM_DIRECTIVE};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Client for one Gemini model.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GatewayConfig, api_key: String) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("news_briefing/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl Generate for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model, purpose = %options.purpose))]
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError> {
        let t0 = Instant::now();
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt, options))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            let err = error_from_body(status, &body);
            warn!(elapsed_ms = dt.as_millis(), error = %err, "Model call failed");
            return Err(err);
        }

        let text = extract_text(&body)?;
        debug!(elapsed_ms = dt.as_millis(), chars = text.chars().count(), "Model call succeeded");
        Ok(text)
    }
}

/// Build the JSON body for one request.
pub(crate) fn build_request(prompt: &str, options: &GenerateOptions) -> Value {
    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_DIRECTIVE }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    });

    if let Some(schema) = &options.structured {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }
    if options.web_tool {
        body["tools"] = json!([{ "google_search": {} }, { "url_context": {} }]);
    }
    body
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: Option<String>,
    status: Option<String>,
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn extract_text(body: &str) -> Result<String, GatewayError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        GatewayError::InvalidResponse(format!("{e}; body={}", truncate_for_log(body, 200)))
    })?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "NO_CANDIDATES".to_string());
        return Err(GatewayError::Empty(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GatewayError::Empty(
            candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string()),
        ));
    }
    Ok(text)
}

/// Map a non-success response to a gateway error.
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> GatewayError {
    let (message, provider_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (
            env.error.message.unwrap_or_else(|| "unknown upstream error".to_string()),
            env.error.status,
        ),
        Err(_) => (truncate_for_log(body, 300), None),
    };

    if status == StatusCode::TOO_MANY_REQUESTS || provider_status.as_deref() == Some("RESOURCE_EXHAUSTED") {
        return GatewayError::RateLimited { message };
    }
    GatewayError::Upstream { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CallPurpose;

    #[test]
    fn test_plain_request_has_directive_only() {
        let body = build_request("요약해 주세요", &GenerateOptions::text(CallPurpose::Summarize));
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], SYSTEM_DIRECTIVE);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "요약해 주세요");
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_structured_request_sets_schema() {
        let schema = json!({ "type": "OBJECT" });
        let body = build_request("p", &GenerateOptions::structured(CallPurpose::Classify, schema.clone()));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
    }

    #[test]
    fn test_web_tool_request_adds_tools() {
        let body = build_request("p", &GenerateOptions::with_web_tool(CallPurpose::Summarize));
        assert_eq!(body["tools"][0], json!({ "google_search": {} }));
        assert_eq!(body["tools"][1], json!({ "url_context": {} }));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"첫 문장. "},{"text":"둘째 문장."}]},"finishReason":"STOP"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "첫 문장. 둘째 문장.");
    }

    #[test]
    fn test_extract_text_reports_block_reason() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        match extract_text(body) {
            Err(GatewayError::Empty(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_extract_text_empty_candidate() {
        let body = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        assert!(matches!(extract_text(body), Err(GatewayError::Empty(r)) if r == "MAX_TOKENS"));
    }

    #[test]
    fn test_extract_text_invalid_json() {
        assert!(matches!(extract_text("oops"), Err(GatewayError::InvalidResponse(_))));
    }

    #[test]
    fn test_rate_limit_detection() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(error_from_body(StatusCode::TOO_MANY_REQUESTS, body).is_rate_limited());
        assert!(error_from_body(StatusCode::TOO_MANY_REQUESTS, "plain text").is_rate_limited());
        assert!(error_from_body(StatusCode::FORBIDDEN, body).is_rate_limited());
    }

    #[test]
    fn test_other_errors_are_upstream() {
        let body = r#"{"error":{"code":400,"message":"Invalid schema","status":"INVALID_ARGUMENT"}}"#;
        match error_from_body(StatusCode::BAD_REQUEST, body) {
            GatewayError::Upstream { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid schema");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new(&GatewayConfig::default(), "key".into()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
