//! Utility functions for string handling and file system checks.
//!
//! - String truncation for logs and for bounding summaries
//! - Whitespace normalization for scraped text
//! - Slugification for report anchors
//! - JSON error detection for handling truncated model responses
//! - Output location validation

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters with an ellipsis and the
/// number of dropped bytes appended. Cuts never split a UTF-8 character.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Trim and collapse every whitespace run into a single space.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Keep at most `max` characters of `s`, appending `…` when anything was cut.
///
/// # Arguments
///
/// * `s` - The text to bound
/// * `max` - Maximum number of characters (not bytes) to keep
///
/// # Returns
///
/// `s` unchanged when it fits, otherwise its first `max` characters with
/// trailing whitespace trimmed and `…` appended.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…", s[..cut].trim_end()),
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the model response is cut off (e.g. by a token limit) the JSON
/// fails to parse with an EOF error, which is worth one more request.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a label to an anchor-friendly slug.
///
/// Lowercases, removes everything that is not alphanumeric, a space or a
/// hyphen, and replaces spaces with hyphens. Hangul is kept.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("경제 뉴스!"), "경제-뉴스");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// Ensure the directory that will hold `file_path` exists and is writable.
///
/// Creates the directory (and any missing parents) if needed, then creates
/// and removes a probe file. Running this before any network work means a
/// bad output path fails the run in milliseconds instead of after every
/// model call has been paid for.
///
/// # Arguments
///
/// * `file_path` - The output file that will be written later. A bare file
///   name is checked against the current directory.
///
/// # Returns
///
/// * `Ok(())` if a file can be created next to `file_path`
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the probe file
/// cannot be written (e.g. permissions, read-only mount).
#[instrument(level = "info", skip_all, fields(path = %file_path.display()))]
pub async fn ensure_writable_parent(file_path: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match file_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;
    let probe_path = dir.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}
