//! Recency filtering and timestamp normalization.
//!
//! The provider stamps items as `Sun, 18 Oct 2026 09:30:00 +0900`. The
//! fixed-width zone suffix is dropped and the remaining wall-clock time is
//! compared with "now" on the same local clock, which is the host's UTC
//! clock shifted by the configured offset.

use crate::models::{NormalizedRecord, RawRecord};
use chrono::{Duration, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

static ZONE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[+-]\d{4}$").expect("static regex"));

/// Current time on the local clock: host UTC plus `utc_offset_hours`.
pub fn local_now(utc_offset_hours: i64) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(utc_offset_hours)
}

/// Parse a provider timestamp into a naive local instant.
///
/// Returns `None` for anything that is not `%a, %d %b %Y %H:%M:%S` with an
/// optional `+HHMM`/`-HHMM` suffix.
pub fn parse_pub_date(raw: &str) -> Option<NaiveDateTime> {
    let naive = ZONE_SUFFIX.replace(raw.trim(), "");
    NaiveDateTime::parse_from_str(&naive, PUB_DATE_FORMAT).ok()
}

/// Keep records published within `window_hours` before `now`.
///
/// Records with unparseable timestamps are dropped. Input order is kept.
pub fn filter_recent(
    records: Vec<RawRecord>,
    window_hours: i64,
    now: NaiveDateTime,
) -> Vec<NormalizedRecord> {
    let window = Duration::hours(window_hours);
    let total = records.len();
    let mut malformed = 0usize;

    let kept: Vec<NormalizedRecord> = records
        .into_iter()
        .filter_map(|r| {
            let Some(published_at) = parse_pub_date(&r.pub_date) else {
                malformed += 1;
                debug!(link = %r.link, pub_date = %r.pub_date, "Dropping record with malformed timestamp");
                return None;
            };
            (now - published_at <= window).then(|| NormalizedRecord {
                title: r.title,
                link: r.link,
                description: r.description,
                published_at,
            })
        })
        .collect();

    info!(total, kept = kept.len(), malformed, window_hours, "Filtered records by recency");
    kept
}
