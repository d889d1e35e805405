//! Naver News Search API client.
//!
//! Queries `GET /v1/search/news.json` with the application's client id and
//! secret. Titles and descriptions come back with `<b>` highlight tags and
//! HTML entities, which are stripped before records leave this module.

use super::{strip_markup, NewsSource};
use crate::config::{SortOrder, SourceConfig};
use crate::error::SourceError;
use crate::models::RawRecord;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Search client holding resolved credentials.
#[derive(Debug)]
pub struct NaverClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    page_size: u32,
    sort: SortOrder,
}

impl NaverClient {
    /// Build a client from the source settings and credentials.
    pub fn new(
        config: &SourceConfig,
        client_id: String,
        client_secret: String,
    ) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("news_briefing/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            page_size: config.page_size,
            sort: config.sort,
        })
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}/v1/search/news.json?query={}&display={}&sort={}",
            self.base_url,
            urlencoding::encode(keyword),
            self.page_size,
            self.sort.as_str()
        )
    }
}

impl NewsSource for NaverClient {
    #[instrument(level = "info", skip(self))]
    async fn search(&self, keyword: &str) -> Result<Vec<RawRecord>, SourceError> {
        let resp = self
            .http
            .get(self.search_url(keyword))
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SourceError::Status {
                status,
                body: truncate_for_log(&body, 300),
            });
        }

        let records = parse_items(&body)?;
        debug!(count = records.len(), "Parsed Naver search items");
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "naver"
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    originallink: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "pubDate")]
    pub_date: String,
}

/// Decode a search response body into records.
///
/// Items without a parseable link are dropped; `originallink` is used when
/// `link` is empty.
pub(crate) fn parse_items(body: &str) -> Result<Vec<RawRecord>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .items
        .into_iter()
        .filter_map(|item| {
            let link = if item.link.trim().is_empty() {
                item.originallink.trim().to_string()
            } else {
                item.link.trim().to_string()
            };
            if Url::parse(&link).is_err() {
                debug!(%link, "Dropping item without a usable link");
                return None;
            }
            Some(RawRecord {
                title: strip_markup(&item.title),
                link,
                description: strip_markup(&item.description),
                pub_date: item.pub_date.trim().to_string(),
            })
        })
        .collect())
}
