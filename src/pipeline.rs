//! The end-to-end briefing run.
//!
//! Stages run strictly in sequence, each consuming the previous stage's
//! output:
//!
//! 1. **Fetch** raw records for every keyword
//! 2. **Filter** to the recency window
//! 3. **Classify** into topics (one model call)
//! 4. **Enrich** each topic's candidates, capped per topic
//! 5. **Assemble** the [`Report`]
//!
//! Writing the report is a separate step ([`write_outputs`]) so that a run
//! that fails never touches the output files.

use crate::classify::{self, Classifier};
use crate::config::{ClassifyFailurePolicy, Config, OutputConfig};
use crate::enrich::content::ContentFetcher;
use crate::enrich::Enricher;
use crate::error::PipelineError;
use crate::filter::filter_recent;
use crate::gateway::Generate;
use crate::models::{NormalizedRecord, Report, Section, TopicBucket};
use crate::outputs::{html, json};
use crate::sources::{self, NewsSource};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument, warn};

/// One configured run over a source, a model gateway and a page fetcher.
#[derive(Debug)]
pub struct Pipeline<'a, S, G, F> {
    source: &'a S,
    gateway: &'a G,
    fetcher: &'a F,
    config: &'a Config,
}

impl<'a, S, G, F> Pipeline<'a, S, G, F>
where
    S: NewsSource,
    G: Generate,
    F: ContentFetcher,
{
    pub fn new(source: &'a S, gateway: &'a G, fetcher: &'a F, config: &'a Config) -> Self {
        Self {
            source,
            gateway,
            fetcher,
            config,
        }
    }

    /// Run every stage and build the report.
    ///
    /// `now` is the local-clock instant used both for the recency window
    /// and as the report's generation time.
    ///
    /// # Errors
    ///
    /// Only classification can fail the run, and only under
    /// [`ClassifyFailurePolicy::Abort`].
    #[instrument(level = "info", skip_all, fields(source = self.source.name(), %now))]
    pub async fn run(&self, now: NaiveDateTime) -> Result<Report, PipelineError> {
        let raw = sources::fetch(self.source, &self.config.keywords).await;
        let fetched = raw.len();

        let recent = filter_recent(raw, self.config.window_hours, now);
        if recent.is_empty() {
            info!(fetched, "No recent records; producing empty report");
            return Ok(self.report(now, Vec::new()));
        }
        let recent_count = recent.len();

        let bucket = self.classify(recent).await?;
        let classified = bucket.record_count();

        let sections = self.enrich(bucket).await;
        let report = self.report(now, sections);

        info!(
            fetched,
            recent = recent_count,
            classified,
            topics = report.sections.len(),
            accepted = report.article_count(),
            "Pipeline finished"
        );
        Ok(report)
    }

    async fn classify(&self, records: Vec<NormalizedRecord>) -> Result<TopicBucket, PipelineError> {
        let classifier = Classifier::new(self.gateway, self.config.classify.max_records);
        match self.config.classify.on_failure {
            ClassifyFailurePolicy::Abort => Ok(classifier.classify(records).await?),
            ClassifyFailurePolicy::Unclassified => {
                let fallback = records.clone();
                match classifier.classify(records).await {
                    Ok(bucket) => Ok(bucket),
                    Err(e) => {
                        warn!(error = %e, "Classification failed; continuing unclassified");
                        Ok(classify::unclassified(fallback))
                    }
                }
            }
        }
    }

    /// Enrich topics in bucket order with one paced worker, so the call
    /// spacing holds across topic boundaries too.
    async fn enrich(&self, bucket: TopicBucket) -> Vec<Section> {
        let enricher = Enricher::new(
            self.gateway,
            self.fetcher,
            &self.config.enrich,
            self.config.search_intent(),
        );
        let mut published: HashSet<String> = HashSet::new();
        let mut sections = Vec::with_capacity(bucket.topics.len());

        for topic in bucket.topics {
            let candidates: Vec<NormalizedRecord> = topic
                .records
                .into_iter()
                .filter(|r| !published.contains(&r.link))
                .collect();

            let articles = enricher.enrich(topic.category, candidates).await;
            published.extend(articles.iter().map(|a| a.link.clone()));
            sections.push(Section {
                topic: topic.category,
                articles,
            });
        }
        sections
    }

    fn report(&self, generated_at: NaiveDateTime, sections: Vec<Section>) -> Report {
        Report {
            title: self.config.output.title.clone(),
            generated_at,
            sections,
        }
    }
}

/// Write the HTML report, and the JSON report when configured.
pub async fn write_outputs(report: &Report, output: &OutputConfig) -> Result<(), Box<dyn Error>> {
    html::write_html(report, Path::new(&output.html_path)).await?;
    if let Some(json_path) = &output.json_path {
        json::write_json(report, Path::new(json_path)).await?;
    }
    Ok(())
}

/// Run the pipeline and write its outputs. Nothing is written on failure.
pub async fn run_and_write<S, G, F>(
    pipeline: &Pipeline<'_, S, G, F>,
    now: NaiveDateTime,
    output: &OutputConfig,
) -> Result<Report, Box<dyn Error>>
where
    S: NewsSource,
    G: Generate,
    F: ContentFetcher,
{
    let report = pipeline.run(now).await?;
    write_outputs(&report, output).await?;
    Ok(report)
}
