//! Error types for each pipeline stage.
//!
//! Stages that may fail soft (source fetches, per-article enrichment) still
//! return typed errors; the caller decides whether to log and continue or to
//! escalate.

use reqwest::StatusCode;

/// Failures surfaced by the model gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model rate limited the request: {message}")]
    RateLimited { message: String },

    #[error("model returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response payload: {0}")]
    InvalidResponse(String),

    #[error("model returned no text (finish reason: {0})")]
    Empty(String),
}

impl GatewayError {
    /// Whether this failure is the provider's rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GatewayError::RateLimited { .. })
    }
}

/// Failures talking to the news-search provider.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search API returned status={status} body={body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid search response JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures while partitioning records into topics.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classification call failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("classification response does not match the expected shape: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Per-candidate failures inside the enrichment worker.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("article fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("article page returned status={0}")]
    FetchStatus(StatusCode),

    #[error("model call failed: {0}")]
    Gateway(#[from] GatewayError),
}

/// Failures that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("classification failed: {0}")]
    Classification(#[from] ClassifyError),
}

/// Failures loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
