//! JSON output of the briefing.
//!
//! The JSON file mirrors the HTML page: the report title, the generation
//! time and the topic sections with their articles, in the same order.

use crate::models::Report;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize `report` and overwrite `path` with it.
///
/// # Arguments
///
/// * `report` - The finished report
/// * `path` - Target file; its parent directory is created if needed
///
/// # Errors
///
/// Returns an error if:
/// - Serialization fails
/// - The parent directory cannot be created
/// - The file cannot be written
///
/// # JSON Schema
///
/// Pretty-printed JSON with `title`, `generated_at` (naive local
/// timestamp) and `sections`, each section holding its `topic` label and
/// its `articles` in report order.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json(report: &Report, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(articles = report.article_count(), "Wrote JSON report");
    Ok(())
}
