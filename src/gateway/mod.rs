//! Language-model gateway.
//!
//! The pipeline talks to the model through the [`Generate`] trait so that
//! decorators can be stacked around the real client:
//!
//! - [`gemini::GeminiClient`]: one `generateContent` request per call
//! - [`retry::RetryGenerate`]: retries rate-limited calls with backoff
//! - [`crate::enrich::pacing::Paced`]: spaces out calls from the enrichment worker
//!
//! Every call carries [`SYSTEM_DIRECTIVE`]. Call modes are selected per
//! request through [`GenerateOptions`].

pub mod gemini;
pub mod retry;

use crate::error::GatewayError;
use serde_json::Value;
use std::fmt;

/// Fixed behavioral directive sent with every request.
pub const SYSTEM_DIRECTIVE: &str = "당신은 뉴스 편집 보조 도구입니다. \
인사말, 맺음말, 부연 설명 없이 요청받은 내용만 출력하세요. \
기사를 요약할 때는 반드시 한국어로 정확히 세 문장으로 작성하세요.";

/// What a call is for. Used for logging and by test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPurpose {
    Classify,
    Summarize,
    Relevance,
    Duplicate,
}

impl CallPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            CallPurpose::Classify => "classify",
            CallPurpose::Summarize => "summarize",
            CallPurpose::Relevance => "relevance",
            CallPurpose::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request mode selection.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub purpose: CallPurpose,
    /// JSON-only output constrained to this response schema.
    pub structured: Option<Value>,
    /// Allow the model to search the web and open URLs.
    pub web_tool: bool,
}

impl GenerateOptions {
    /// Free-text response.
    pub fn text(purpose: CallPurpose) -> Self {
        Self {
            purpose,
            structured: None,
            web_tool: false,
        }
    }

    /// JSON response matching `schema`.
    pub fn structured(purpose: CallPurpose, schema: Value) -> Self {
        Self {
            purpose,
            structured: Some(schema),
            web_tool: false,
        }
    }

    /// Free-text response with web retrieval enabled.
    pub fn with_web_tool(purpose: CallPurpose) -> Self {
        Self {
            purpose,
            structured: None,
            web_tool: true,
        }
    }
}

/// A text-generation backend.
pub trait Generate {
    /// Send `prompt` and return the model's text.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError>;
}

impl<T: Generate> Generate for &T {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError> {
        (**self).generate(prompt, options).await
    }
}

/// Interpret a closed yes/no answer.
///
/// Returns `None` when the answer is neither; callers pick the fallback.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    let first = answer
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or("")
        .to_lowercase();
    match first.as_str() {
        "예" | "네" | "yes" | "y" => Some(true),
        "아니오" | "아니요" | "아니" | "no" | "n" => Some(false),
        _ => None,
    }
}
