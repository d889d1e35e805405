//! Topic classification and duplicate collapsing.
//!
//! The whole record set goes to the model in one structured-output request.
//! The model decides which records describe the same event and which
//! category each event belongs to; this module only shapes the request and
//! validates the answer:
//!
//! 1. The response must deserialize into the expected shape, otherwise the
//!    batch fails with [`ClassifyError::Malformed`].
//! 2. Labels outside the closed set become [`Category::Uncategorized`].
//! 3. Links the model invented, or placed twice, are dropped.
//! 4. Each topic is ordered by duplicate-cluster size, largest first.

use crate::error::ClassifyError;
use crate::gateway::{CallPurpose, Generate, GenerateOptions};
use crate::models::{Category, NormalizedRecord, Topic, TopicBucket};
use crate::utils::{looks_truncated, truncate_for_log};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Expected response shape.
#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    topics: Vec<TopicEntry>,
}

#[derive(Debug, Deserialize)]
struct TopicEntry {
    category: String,
    articles: Vec<ArticleEntry>,
}

#[derive(Debug, Deserialize)]
struct ArticleEntry {
    link: String,
    cluster_size: u32,
}

#[derive(Serialize)]
struct PromptItem<'a> {
    link: &'a str,
    title: &'a str,
    description: &'a str,
}

/// Partitions records into topics through the model gateway.
#[derive(Debug)]
pub struct Classifier<'a, G> {
    gateway: &'a G,
    max_records: usize,
}

impl<'a, G: Generate> Classifier<'a, G> {
    pub fn new(gateway: &'a G, max_records: usize) -> Self {
        Self {
            gateway,
            max_records: max_records.max(1),
        }
    }

    /// Classify `records` into a [`TopicBucket`].
    ///
    /// Only the first `max_records` records are sent. A response cut off
    /// mid-JSON is re-asked once; any other parse failure is returned.
    #[instrument(level = "info", skip_all, fields(records = records.len()))]
    pub async fn classify(&self, mut records: Vec<NormalizedRecord>) -> Result<TopicBucket, ClassifyError> {
        if records.len() > self.max_records {
            warn!(
                dropped = records.len() - self.max_records,
                max = self.max_records,
                "Too many records for one classification prompt; truncating"
            );
            records.truncate(self.max_records);
        }

        let prompt = build_prompt(&records);
        let options = GenerateOptions::structured(CallPurpose::Classify, response_schema());

        let text = self.gateway.generate(&prompt, &options).await?;
        let response = match parse_response(&text) {
            Ok(r) => r,
            Err(e) if looks_truncated(&e) => {
                warn!(error = %e, "Classification response truncated; re-asking once");
                let retry = self.gateway.generate(&prompt, &options).await?;
                parse_response(&retry).inspect_err(|e| {
                    warn!(error = %e, response_preview = %truncate_for_log(&retry, 300), "Re-asked classification still malformed");
                })?
            }
            Err(e) => {
                warn!(error = %e, response_preview = %truncate_for_log(&text, 300), "Classification response malformed");
                return Err(e.into());
            }
        };

        let bucket = build_bucket(response, records);
        info!(
            topics = bucket.topics.len(),
            records = bucket.record_count(),
            "Classified records into topics"
        );
        Ok(bucket)
    }
}

/// Put every record into one uncategorized topic, keeping input order.
pub fn unclassified(records: Vec<NormalizedRecord>) -> TopicBucket {
    if records.is_empty() {
        return TopicBucket::default();
    }
    TopicBucket {
        topics: vec![Topic {
            category: Category::Uncategorized,
            records,
        }],
    }
}

fn category_list() -> String {
    Category::ASSIGNABLE
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_prompt(records: &[NormalizedRecord]) -> String {
    let items: Vec<PromptItem<'_>> = records
        .iter()
        .map(|r| PromptItem {
            link: &r.link,
            title: &r.title,
            description: &r.description,
        })
        .collect();
    let listing = serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string());

    format!(
        "다음은 최근 수집된 뉴스 목록입니다.\n\
         1. 각 기사를 다음 카테고리 중 하나로 분류하세요: {categories}\n\
         2. 같은 사건을 다룬 기사들은 하나로 합치고 대표 기사 하나의 link만 남기세요. \
         cluster_size에는 합쳐진 기사 수를 적으세요.\n\
         3. 각 카테고리 안에서는 cluster_size가 큰 순서로 정렬하세요.\n\
         4. link 값은 목록에 있는 그대로 사용하세요.\n\
         \n뉴스 목록:\n{listing}",
        categories = category_list(),
    )
}

fn response_schema() -> Value {
    let labels: Vec<&str> = Category::ASSIGNABLE.iter().map(|c| c.label()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "topics": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": { "type": "STRING", "enum": labels },
                        "articles": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "link": { "type": "STRING" },
                                    "cluster_size": { "type": "INTEGER" }
                                },
                                "required": ["link", "cluster_size"]
                            }
                        }
                    },
                    "required": ["category", "articles"]
                }
            }
        },
        "required": ["topics"]
    })
}

/// Strip one surrounding Markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_response(text: &str) -> Result<ClassificationResponse, serde_json::Error> {
    serde_json::from_str(strip_code_fence(text))
}

/// Validate a parsed response against the records that were sent.
fn build_bucket(response: ClassificationResponse, records: Vec<NormalizedRecord>) -> TopicBucket {
    let mut by_link: HashMap<String, NormalizedRecord> =
        records.into_iter().map(|r| (r.link.clone(), r)).collect();
    let mut topics: Vec<(Category, Vec<(u32, NormalizedRecord)>)> = Vec::new();

    for entry in response.topics {
        let category = Category::from_label(&entry.category);
        if category == Category::Uncategorized {
            warn!(label = %entry.category, "Unknown category label; routing to uncategorized");
        }

        let idx = match topics.iter().position(|(c, _)| *c == category) {
            Some(idx) => idx,
            None => {
                topics.push((category, Vec::new()));
                topics.len() - 1
            }
        };

        for article in entry.articles {
            match by_link.remove(article.link.trim()) {
                Some(record) => topics[idx].1.push((article.cluster_size, record)),
                None => warn!(link = %article.link, "Link unknown or already placed; dropping"),
            }
        }
    }

    let topics = topics
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(category, mut items)| {
            items.sort_by(|a, b| b.0.cmp(&a.0));
            Topic {
                category,
                records: items.into_iter().map(|(_, r)| r).collect(),
            }
        })
        .collect();

    TopicBucket { topics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{normalized, ScriptedGateway};
    use crate::error::GatewayError;

    fn records() -> Vec<NormalizedRecord> {
        vec![
            normalized("반도체 수출 급증", "https://n.com/1"),
            normalized("반도체 수출 역대 최대", "https://n.com/2"),
            normalized("AI 기본법 국회 통과", "https://n.com/3"),
            normalized("생성형 AI 신제품", "https://n.com/4"),
        ]
    }

    fn links(topic: &Topic) -> Vec<&str> {
        topic.records.iter().map(|r| r.link.as_str()).collect()
    }

    #[tokio::test]
    async fn test_classify_orders_by_cluster_size() {
        let gateway = ScriptedGateway::new(vec![Ok(r#"{"topics":[
            {"category":"IT","articles":[
                {"link":"https://n.com/4","cluster_size":1},
                {"link":"https://n.com/1","cluster_size":2}
            ]},
            {"category":"정치","articles":[{"link":"https://n.com/3","cluster_size":1}]}
        ]}"#
        .to_string())]);

        let bucket = Classifier::new(&gateway, 50).classify(records()).await.unwrap();

        assert_eq!(bucket.topics.len(), 2);
        assert_eq!(bucket.topics[0].category, Category::It);
        assert_eq!(links(&bucket.topics[0]), vec!["https://n.com/1", "https://n.com/4"]);
        assert_eq!(bucket.topics[1].category, Category::Politics);

        let request = gateway.requests();
        assert_eq!(request.len(), 1);
        assert_eq!(request[0].1.purpose, CallPurpose::Classify);
        assert!(request[0].1.structured.is_some());
        assert!(request[0].0.contains("경제, 사회, 문화, 산업, 정치, IT, 해외"));
    }

    #[tokio::test]
    async fn test_unknown_labels_route_to_uncategorized_and_merge() {
        let gateway = ScriptedGateway::new(vec![Ok(r#"{"topics":[
            {"category":"스포츠","articles":[{"link":"https://n.com/3","cluster_size":1}]},
            {"category":"IT","articles":[{"link":"https://n.com/4","cluster_size":1}]},
            {"category":"연예","articles":[{"link":"https://n.com/1","cluster_size":3}]}
        ]}"#
        .to_string())]);

        let bucket = Classifier::new(&gateway, 50).classify(records()).await.unwrap();

        let categories: Vec<Category> = bucket.topics.iter().map(|t| t.category).collect();
        assert_eq!(categories, vec![Category::Uncategorized, Category::It]);
        assert_eq!(links(&bucket.topics[0]), vec!["https://n.com/1", "https://n.com/3"]);
    }

    #[tokio::test]
    async fn test_invented_and_repeated_links_are_dropped() {
        let gateway = ScriptedGateway::new(vec![Ok(r#"```json
{"topics":[
    {"category":"경제","articles":[
        {"link":"https://n.com/1","cluster_size":2},
        {"link":"https://made.up/9","cluster_size":5}
    ]},
    {"category":"산업","articles":[{"link":"https://n.com/1","cluster_size":2}]}
]}
```"#
        .to_string())]);

        let bucket = Classifier::new(&gateway, 50).classify(records()).await.unwrap();

        assert_eq!(bucket.topics.len(), 1);
        assert_eq!(bucket.topics[0].category, Category::Economy);
        assert_eq!(links(&bucket.topics[0]), vec!["https://n.com/1"]);
    }

    #[tokio::test]
    async fn test_malformed_response_is_typed_error() {
        let gateway = ScriptedGateway::new(vec![Ok("분류 결과는 다음과 같습니다: 경제".to_string())]);

        let err = Classifier::new(&gateway, 50).classify(records()).await.unwrap_err();

        assert!(matches!(err, ClassifyError::Malformed(_)));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_malformed() {
        let gateway = ScriptedGateway::new(vec![Ok(
            r#"{"topics":[{"category":"IT","articles":[{"link":"https://n.com/1"}]}]}"#.to_string(),
        )]);

        let err = Classifier::new(&gateway, 50).classify(records()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_truncated_response_is_reasked_once() {
        let gateway = ScriptedGateway::new(vec![
            Ok(r#"{"topics":[{"category":"IT","articles":[{"link":"#.to_string()),
            Ok(r#"{"topics":[{"category":"IT","articles":[{"link":"https://n.com/4","cluster_size":1}]}]}"#.to_string()),
        ]);

        let bucket = Classifier::new(&gateway, 50).classify(records()).await.unwrap();

        assert_eq!(gateway.calls(), 2);
        assert_eq!(bucket.record_count(), 1);
    }

    #[tokio::test]
    async fn test_gateway_error_propagates() {
        let gateway = ScriptedGateway::new(vec![Err(GatewayError::RateLimited {
            message: "quota".into(),
        })]);

        let err = Classifier::new(&gateway, 50).classify(records()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Gateway(e) if e.is_rate_limited()));
    }

    #[tokio::test]
    async fn test_prompt_is_bounded_to_max_records() {
        let gateway = ScriptedGateway::new(vec![Ok(r#"{"topics":[]}"#.to_string())]);

        let bucket = Classifier::new(&gateway, 2).classify(records()).await.unwrap();

        assert!(bucket.topics.is_empty());
        let prompt = &gateway.requests()[0].0;
        assert!(prompt.contains("https://n.com/2"));
        assert!(!prompt.contains("https://n.com/3"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_unclassified_keeps_order() {
        let bucket = unclassified(records());
        assert_eq!(bucket.topics.len(), 1);
        assert_eq!(bucket.topics[0].category, Category::Uncategorized);
        assert_eq!(bucket.topics[0].records[2].link, "https://n.com/3");
        assert!(unclassified(Vec::new()).topics.is_empty());
    }
}
