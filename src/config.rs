//! Run configuration loaded from a YAML file.
//!
//! Every key is optional; missing keys take the defaults below. A missing
//! file at the default location means "use defaults", while a missing file
//! that was named explicitly on the command line is an error.
//!
//! ```yaml
//! keywords: ["AI", "인공지능"]
//! window_hours: 24
//! classify:
//!   on_failure: unclassified
//! enrich:
//!   content_mode: gateway
//!   call_delay_secs: 4
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Longest accepted recency window (one year).
pub const MAX_WINDOW_HOURS: i64 = 24 * 365;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search keywords; one provider query per keyword.
    pub keywords: Vec<String>,
    /// Trailing recency window in hours.
    pub window_hours: i64,
    /// Offset from the host's UTC clock to the local clock the provider uses.
    pub utc_offset_hours: i64,
    pub source: SourceConfig,
    pub gateway: GatewayConfig,
    pub classify: ClassifyConfig,
    pub enrich: EnrichConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: vec!["AI".to_string(), "인공지능".to_string()],
            window_hours: 24,
            utc_offset_hours: 9,
            source: SourceConfig::default(),
            gateway: GatewayConfig::default(),
            classify: ClassifyConfig::default(),
            enrich: EnrichConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Ranking requested from the search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Similarity to the query.
    Sim,
    /// Newest first.
    Date,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Sim => "sim",
            SortOrder::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    /// Results requested per keyword (the provider caps this at 100).
    pub page_size: u32,
    pub sort: SortOrder,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openapi.naver.com".to_string(),
            page_size: 50,
            sort: SortOrder::Sim,
            timeout_secs: 15,
        }
    }
}

/// Shape of the delay between retried model calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// `attempt × base`
    Linear,
    /// `base × 2^(attempt-1)`, capped at 30s
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub base_delay_secs: u64,
    pub backoff: BackoffKind,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 90,
            max_attempts: 3,
            base_delay_secs: 5,
            backoff: BackoffKind::Linear,
        }
    }
}

/// What to do when the classifier cannot produce a valid topic partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyFailurePolicy {
    /// Stop the run without writing a report.
    Abort,
    /// Continue with every record in one uncategorized topic.
    Unclassified,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Upper bound on records sent in the classification prompt.
    pub max_records: usize,
    pub on_failure: ClassifyFailurePolicy,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            max_records: 50,
            on_failure: ClassifyFailurePolicy::Abort,
        }
    }
}

/// Where the enrichment worker gets article text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Download the page and summarize the extracted text.
    Direct,
    /// Let the model open the link itself with its web tools.
    Gateway,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub per_topic_cap: usize,
    pub content_mode: ContentMode,
    /// Content shorter than this is treated as unusable.
    pub min_content_chars: usize,
    /// Article text beyond this is cut before it goes into a prompt.
    pub max_content_chars: usize,
    pub max_summary_chars: usize,
    pub relevance_check: bool,
    pub duplicate_check: bool,
    /// Minimum spacing between consecutive model calls.
    pub call_delay_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            per_topic_cap: 5,
            content_mode: ContentMode::Direct,
            min_content_chars: 200,
            max_content_chars: 6000,
            max_summary_chars: 600,
            relevance_check: true,
            duplicate_check: true,
            call_delay_secs: 4,
            fetch_timeout_secs: 15,
        }
    }
}

impl EnrichConfig {
    pub fn call_delay(&self) -> Duration {
        Duration::from_secs(self.call_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub html_path: String,
    /// Also write the report as JSON when set.
    pub json_path: Option<String>,
    pub title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html_path: "index.html".to_string(),
            json_path: None,
            title: "AI 뉴스 브리핑".to_string(),
        }
    }
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`.
    ///
    /// When `required` is false and the file does not exist, defaults are used.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !required && !path.exists() {
            info!("No config file found; using defaults");
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Config::from_yaml(&text)?;
        info!(keywords = ?config.keywords, window_hours = config.window_hours, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid("keywords must not be empty".to_string()));
        }
        if !(1..=MAX_WINDOW_HOURS).contains(&self.window_hours) {
            return Err(ConfigError::Invalid(format!(
                "window_hours must be within 1..={MAX_WINDOW_HOURS}"
            )));
        }
        if !(-14..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::Invalid("utc_offset_hours must be within -14..=14".to_string()));
        }
        if self.gateway.max_attempts == 0 {
            return Err(ConfigError::Invalid("gateway.max_attempts must be at least 1".to_string()));
        }
        if self.enrich.per_topic_cap == 0 {
            return Err(ConfigError::Invalid("enrich.per_topic_cap must be at least 1".to_string()));
        }
        if self.classify.max_records == 0 {
            return Err(ConfigError::Invalid("classify.max_records must be at least 1".to_string()));
        }
        if !(1..=100).contains(&self.source.page_size) {
            return Err(ConfigError::Invalid("source.page_size must be within 1..=100".to_string()));
        }
        Ok(())
    }

    /// The search intent used for relevance checks.
    pub fn search_intent(&self) -> String {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.keywords, vec!["AI", "인공지능"]);
        assert_eq!(config.source.page_size, 50);
        assert_eq!(config.source.sort, SortOrder::Sim);
        assert_eq!(config.gateway.max_attempts, 3);
        assert_eq!(config.enrich.per_topic_cap, 5);
        assert_eq!(config.classify.on_failure, ClassifyFailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            r#"
keywords: ["반도체"]
classify:
  on_failure: unclassified
enrich:
  content_mode: gateway
"#,
        )
        .unwrap();

        assert_eq!(config.keywords, vec!["반도체"]);
        assert_eq!(config.classify.on_failure, ClassifyFailurePolicy::Unclassified);
        assert_eq!(config.classify.max_records, 50);
        assert_eq!(config.enrich.content_mode, ContentMode::Gateway);
        assert_eq!(config.enrich.min_content_chars, 200);
        assert_eq!(config.window_hours, 24);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            Config::from_yaml("keywords: []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_yaml("enrich:\n  per_topic_cap: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_yaml("gateway:\n  backoff: random"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_time_settings() {
        for yaml in [
            "window_hours: 0",
            "window_hours: 9000000000000000",
            "window_hours: 8761",
            "utc_offset_hours: 15",
            "utc_offset_hours: -9000000000000000",
        ] {
            assert!(
                matches!(Config::from_yaml(yaml), Err(ConfigError::Invalid(_))),
                "{yaml}"
            );
        }

        let config = Config::from_yaml("window_hours: 8760\nutc_offset_hours: -14").unwrap();
        let now = crate::filter::local_now(config.utc_offset_hours);
        assert!(crate::filter::filter_recent(Vec::new(), config.window_hours, now).is_empty());
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let config = Config::load(Path::new("/definitely/not/here.yaml"), false).unwrap();
        assert_eq!(config.window_hours, 24);
    }

    #[test]
    fn test_missing_required_file_is_error() {
        let err = Config::load(Path::new("/definitely/not/here.yaml"), true).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_search_intent_joins_keywords() {
        let config = Config::from_yaml("keywords: [\"AI\", \" \", \"인공지능\"]").unwrap();
        assert_eq!(config.search_intent(), "AI OR 인공지능");
    }
}
