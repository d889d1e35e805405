//! Per-topic article enrichment.
//!
//! For one topic the [`Enricher`] walks the classifier's candidates in
//! priority order and accepts at most `per_topic_cap` of them. For each
//! candidate it:
//!
//! 1. Obtains a summary, either from the fetched page (`direct`) or by letting
//!    the model open the link (`gateway`). Unusable content degrades to the
//!    search snippet, or to [`SUMMARY_SENTINEL`] when there is no snippet.
//! 2. Optionally asks whether the summary matches the search intent.
//! 3. Optionally asks whether it repeats a summary already accepted for this
//!    topic.
//!
//! Rejections do not count toward the cap. Any error on a candidate skips
//! that candidate only. Model calls from the worker go through [`Paced`].

pub mod content;
pub mod pacing;

use crate::config::{ContentMode, EnrichConfig};
use crate::error::EnrichError;
use crate::gateway::{parse_yes_no, CallPurpose, Generate, GenerateOptions};
use crate::models::{Category, EnrichedArticle, NormalizedRecord, SUMMARY_SENTINEL};
use crate::utils::{truncate_chars, truncate_for_log};
use content::{assess, ContentFetcher};
use pacing::Paced;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Generated summaries shorter than this are treated as failed retrievals.
const MIN_SUMMARY_CHARS: usize = 20;

/// Phrases the model uses when it could not open a page.
const RETRIEVAL_FAILURE_MARKERS: &[&str] = &["열 수 없", "접근할 수 없", "확인할 수 없", "찾을 수 없"];

/// Where a candidate's summary text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Summary {
    Generated(String),
    Snippet(String),
    Sentinel,
}

impl Summary {
    /// Text that can be judged for relevance and duplication.
    fn judgeable(&self) -> Option<&str> {
        match self {
            Summary::Generated(s) | Summary::Snippet(s) => Some(s),
            Summary::Sentinel => None,
        }
    }

    fn into_text(self) -> String {
        match self {
            Summary::Generated(s) | Summary::Snippet(s) => s,
            Summary::Sentinel => SUMMARY_SENTINEL.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Summary::Generated(_) => "generated",
            Summary::Snippet(_) => "snippet",
            Summary::Sentinel => "sentinel",
        }
    }
}

/// Summarizes and screens candidates for one topic at a time.
#[derive(Debug)]
pub struct Enricher<'a, G, F> {
    gateway: Paced<&'a G>,
    fetcher: &'a F,
    config: &'a EnrichConfig,
    intent: String,
}

impl<'a, G: Generate, F: ContentFetcher> Enricher<'a, G, F> {
    /// `intent` is the search intent used for relevance checks.
    pub fn new(gateway: &'a G, fetcher: &'a F, config: &'a EnrichConfig, intent: String) -> Self {
        Self {
            gateway: Paced::new(gateway, config.call_delay()),
            fetcher,
            config,
            intent,
        }
    }

    /// Enrich the candidates of one topic, in priority order.
    #[instrument(level = "info", skip_all, fields(topic = %topic, candidates = candidates.len()))]
    pub async fn enrich(&self, topic: Category, candidates: Vec<NormalizedRecord>) -> Vec<EnrichedArticle> {
        let cap = self.config.per_topic_cap;
        let mut accepted: Vec<EnrichedArticle> = Vec::new();
        let mut seen_summaries: Vec<String> = Vec::new();
        let mut seen_links: HashSet<String> = HashSet::new();
        let mut rejected = 0usize;
        let mut failed = 0usize;

        for record in candidates {
            if accepted.len() >= cap {
                break;
            }
            if !seen_links.insert(record.link.clone()) {
                continue;
            }

            let summary = match self.summarize(&record).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(link = %record.link, error = %e, "Enrichment failed; skipping candidate");
                    failed += 1;
                    continue;
                }
            };

            if let Some(text) = summary.judgeable() {
                match self.screen(text, &seen_summaries).await {
                    Ok(true) => seen_summaries.push(text.to_string()),
                    Ok(false) => {
                        rejected += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(link = %record.link, error = %e, "Judgment failed; skipping candidate");
                        failed += 1;
                        continue;
                    }
                }
            }

            debug!(link = %record.link, kind = summary.kind(), "Accepted article");
            accepted.push(EnrichedArticle {
                title: record.title,
                link: record.link,
                summary: summary.into_text(),
                topic,
            });
        }

        info!(accepted = accepted.len(), rejected, failed, "Finished topic");
        accepted
    }

    async fn summarize(&self, record: &NormalizedRecord) -> Result<Summary, EnrichError> {
        match self.config.content_mode {
            ContentMode::Direct => {
                let text = self.fetcher.fetch(&record.link).await?;
                let verdict = assess(&text, self.config.min_content_chars);
                if !verdict.is_usable() {
                    info!(link = %record.link, ?verdict, "Article content unusable; falling back");
                    return Ok(self.fallback(record));
                }
                let body = truncate_chars(&text, self.config.max_content_chars);
                let prompt = summarize_prompt(&record.title, &body);
                let out = self
                    .gateway
                    .generate(&prompt, &GenerateOptions::text(CallPurpose::Summarize))
                    .await?;
                Ok(self.accept_generated(record, out))
            }
            ContentMode::Gateway => {
                let prompt = retrieve_prompt(&record.title, &record.link);
                let out = self
                    .gateway
                    .generate(&prompt, &GenerateOptions::with_web_tool(CallPurpose::Summarize))
                    .await?;
                Ok(self.accept_generated(record, out))
            }
        }
    }

    fn accept_generated(&self, record: &NormalizedRecord, out: String) -> Summary {
        let out = out.trim();
        let too_short = out.chars().filter(|c| !c.is_whitespace()).count() < MIN_SUMMARY_CHARS;
        if too_short || RETRIEVAL_FAILURE_MARKERS.iter().any(|m| out.contains(m)) {
            info!(
                link = %record.link,
                response_preview = %truncate_for_log(out, 80),
                "Model summary unusable; falling back"
            );
            return self.fallback(record);
        }
        Summary::Generated(truncate_chars(out, self.config.max_summary_chars))
    }

    fn fallback(&self, record: &NormalizedRecord) -> Summary {
        let snippet = record.description.trim();
        if snippet.is_empty() {
            Summary::Sentinel
        } else {
            Summary::Snippet(truncate_chars(snippet, self.config.max_summary_chars))
        }
    }

    /// Run the enabled judgments. `Ok(false)` means reject.
    async fn screen(&self, summary: &str, seen: &[String]) -> Result<bool, EnrichError> {
        if self.config.relevance_check && !self.is_relevant(summary).await? {
            info!(summary = %truncate_for_log(summary, 60), "Rejected as irrelevant");
            return Ok(false);
        }
        if self.config.duplicate_check && !seen.is_empty() && self.is_duplicate(summary, seen).await? {
            info!(summary = %truncate_for_log(summary, 60), "Rejected as duplicate");
            return Ok(false);
        }
        Ok(true)
    }

    async fn is_relevant(&self, summary: &str) -> Result<bool, EnrichError> {
        let prompt = relevance_prompt(&self.intent, summary);
        let answer = self
            .gateway
            .generate(&prompt, &GenerateOptions::text(CallPurpose::Relevance))
            .await?;
        Ok(parse_yes_no(&answer).unwrap_or_else(|| {
            warn!(answer = %truncate_for_log(&answer, 60), "Unclear relevance answer; keeping");
            true
        }))
    }

    async fn is_duplicate(&self, summary: &str, seen: &[String]) -> Result<bool, EnrichError> {
        let prompt = duplicate_prompt(summary, seen);
        let answer = self
            .gateway
            .generate(&prompt, &GenerateOptions::text(CallPurpose::Duplicate))
            .await?;
        Ok(parse_yes_no(&answer).unwrap_or_else(|| {
            warn!(answer = %truncate_for_log(&answer, 60), "Unclear duplicate answer; keeping");
            false
        }))
    }
}

fn summarize_prompt(title: &str, body: &str) -> String {
    format!("다음 기사 본문을 한국어 세 문장으로 요약하세요.\n제목: {title}\n본문:\n{body}")
}

fn retrieve_prompt(title: &str, link: &str) -> String {
    format!(
        "다음 링크의 뉴스 기사를 직접 열어 읽고 한국어 세 문장으로 요약하세요. \
         기사를 열 수 없으면 '열 수 없음'이라고만 답하세요.\n제목: {title}\n링크: {link}"
    )
}

fn relevance_prompt(intent: &str, summary: &str) -> String {
    format!(
        "검색 의도: {intent}\n기사 요약: {summary}\n\
         이 기사가 검색 의도와 관련이 있습니까? '예' 또는 '아니오'로만 답하세요."
    )
}

fn duplicate_prompt(summary: &str, seen: &[String]) -> String {
    let listing = seen
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "이미 선정된 기사 요약:\n{listing}\n\n새 기사 요약: {summary}\n\
         새 기사가 이미 선정된 기사 중 하나와 같은 사건을 다룹니까? '예' 또는 '아니오'로만 답하세요."
    )
}
