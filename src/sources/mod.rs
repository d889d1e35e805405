//! News-search sources.
//!
//! A source answers one keyword query at a time. [`fetch`] runs every keyword
//! against a source in order, tolerates per-keyword failures, and merges the
//! hits into one list with each link appearing once.
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Naver News Search | [`naver`] | JSON search API, client id/secret headers |

pub mod naver;

use crate::error::SourceError;
use crate::models::RawRecord;
use crate::utils::collapse_whitespace;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use scraper::Html;
use tracing::{info, instrument, warn};

/// A provider that can be queried for recent news by keyword.
pub trait NewsSource {
    /// Run one keyword query.
    async fn search(&self, keyword: &str) -> Result<Vec<RawRecord>, SourceError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Query `source` once per keyword and merge the results.
///
/// A failure for one keyword is logged and contributes no records. Results
/// are interleaved by rank across keywords and de-duplicated by link, first
/// occurrence winning.
#[instrument(level = "info", skip_all, fields(source = source.name(), keywords = keywords.len()))]
pub async fn fetch<S: NewsSource>(source: &S, keywords: &[String]) -> Vec<RawRecord> {
    let per_keyword: Vec<Vec<RawRecord>> = stream::iter(keywords.iter().filter(|k| !k.trim().is_empty()))
        .then(|keyword| async move {
            match source.search(keyword.trim()).await {
                Ok(records) => {
                    info!(%keyword, count = records.len(), "Keyword query returned records");
                    records
                }
                Err(e) => {
                    warn!(%keyword, error = %e, "Keyword query failed; continuing without it");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    let total: usize = per_keyword.iter().map(Vec::len).sum();
    let merged: Vec<RawRecord> = round_robin(per_keyword)
        .into_iter()
        .unique_by(|r| r.link.clone())
        .collect();

    info!(total, unique = merged.len(), "Merged keyword results");
    merged
}

/// Take the first result of every keyword, then every second result, and so
/// on, so that a later cap on the record count keeps each keyword's top hits.
fn round_robin(lists: Vec<Vec<RawRecord>>) -> Vec<RawRecord> {
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut out = Vec::new();
    loop {
        let before = out.len();
        for it in iters.iter_mut() {
            out.extend(it.next());
        }
        if out.len() == before {
            return out;
        }
    }
}

/// Remove HTML tags, decode entities and collapse whitespace.
///
/// ```ignore
/// assert_eq!(strip_markup("<b>AI</b> &quot;열풍&quot;"), "AI \"열풍\"");
/// ```
pub fn strip_markup(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let plain = fragment.root_element().text().collect::<String>();
    collapse_whitespace(&plain)
}
