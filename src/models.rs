//! Data models flowing through the briefing pipeline.
//!
//! Each stage consumes the previous stage's value and produces a new one:
//! - [`RawRecord`]: a search hit with markup stripped, timestamp still raw
//! - [`NormalizedRecord`]: a record whose publication time parsed cleanly
//! - [`TopicBucket`]: records partitioned into [`Category`] topics by priority
//! - [`EnrichedArticle`]: a record with its summary attached
//! - [`Report`]: the ordered sections that get rendered

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;

/// A news item as returned by the search provider.
///
/// `title` and `description` are plain text; `pub_date` is the provider's
/// timestamp string and is only parsed by the recency filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Headline with markup removed.
    pub title: String,
    /// Canonical link; the de-duplication key for the whole pipeline.
    pub link: String,
    /// Short snippet supplied by the provider, markup removed.
    pub description: String,
    /// Publication time as sent by the provider (RFC-822-like).
    pub pub_date: String,
}

/// A record whose publication time parsed into a comparable local instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Publication time on the local (offset-corrected) clock.
    pub published_at: NaiveDateTime,
}

/// The closed set of topics used to group records.
///
/// Labels the model invents outside this set land in [`Category::Uncategorized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Economy,
    Society,
    Culture,
    Industry,
    Politics,
    It,
    World,
    Uncategorized,
}

impl Category {
    /// Categories offered to the classifier, in display order.
    pub const ASSIGNABLE: [Category; 7] = [
        Category::Economy,
        Category::Society,
        Category::Culture,
        Category::Industry,
        Category::Politics,
        Category::It,
        Category::World,
    ];

    /// Label used in prompts and in the rendered report.
    pub fn label(self) -> &'static str {
        match self {
            Category::Economy => "경제",
            Category::Society => "사회",
            Category::Culture => "문화",
            Category::Industry => "산업",
            Category::Politics => "정치",
            Category::It => "IT",
            Category::World => "해외",
            Category::Uncategorized => "기타",
        }
    }

    /// Map a label returned by the model onto the closed set.
    ///
    /// Matching ignores surrounding whitespace and ASCII case. Anything
    /// unknown (including "기타" itself) becomes [`Category::Uncategorized`].
    pub fn from_label(label: &str) -> Category {
        let label = label.trim();
        Category::ASSIGNABLE
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
            .unwrap_or(Category::Uncategorized)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One topic produced by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub category: Category,
    /// Candidates in priority order (largest duplicate cluster first).
    pub records: Vec<NormalizedRecord>,
}

/// Topic-partitioned records in classifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicBucket {
    pub topics: Vec<Topic>,
}

impl TopicBucket {
    /// Total number of records across all topics.
    pub fn record_count(&self) -> usize {
        self.topics.iter().map(|t| t.records.len()).sum()
    }
}

/// A record that made it through enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedArticle {
    pub title: String,
    pub link: String,
    /// A model summary, the provider snippet, or [`SUMMARY_SENTINEL`].
    pub summary: String,
    pub topic: Category,
}

impl EnrichedArticle {
    /// Host of the article link without a leading `www.`, for display.
    ///
    /// For example: "https://www.hankyung.com/article/1" -> "hankyung.com"
    pub fn source_host(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.link).ok()?;
        let host = parsed.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }
}

/// Summary text used when neither the article nor a snippet is available.
pub const SUMMARY_SENTINEL: &str = "요약 실패: 기사 본문을 가져오지 못했습니다.";

/// A rendered topic section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub topic: Category,
    pub articles: Vec<EnrichedArticle>,
}

/// The terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    /// Generation time on the local clock.
    pub generated_at: NaiveDateTime,
    pub sections: Vec<Section>,
}

impl Report {
    /// Number of articles across all sections.
    pub fn article_count(&self) -> usize {
        self.sections.iter().map(|s| s.articles.len()).sum()
    }
}
