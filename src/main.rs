//! # News Briefing
//!
//! A batch job that searches the Naver news API for a set of keywords,
//! keeps the last day's articles, has Gemini group them into topics and
//! collapse duplicate coverage, summarizes the top articles of each topic
//! and renders everything into a single HTML briefing page.
//!
//! ## Usage
//!
//! ```sh
//! news_briefing -o public/index.html
//! ```
//!
//! ## Architecture
//!
//! The run is a strictly sequential pipeline (see [`pipeline`]):
//! 1. **Fetching**: one search query per keyword, merged and deduplicated by link
//! 2. **Filtering**: keep records inside the recency window
//! 3. **Classifying**: one structured-output model call partitions records into topics
//! 4. **Enriching**: summarize and screen up to five articles per topic, with
//!    paced and retried model calls
//! 5. **Output**: write the HTML page, and optionally a JSON copy

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod classify;
mod cli;
mod config;
mod enrich;
mod error;
mod filter;
mod gateway;
mod models;
mod outputs;
mod pipeline;
mod sources;
#[cfg(test)]
mod test_support;
mod utils;

use cli::Cli;
use config::Config;
use enrich::content::HttpFetcher;
use filter::local_now;
use gateway::gemini::GeminiClient;
use gateway::retry::{RetryGenerate, RetryPolicy};
use pipeline::{run_and_write, Pipeline};
use sources::naver::NaverClient;
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_briefing starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.output, ?args.json_output, "Parsed CLI arguments");

    // ---- Load config ----
    let (config_path, required) = args.config_source();
    let mut config = Config::load(&config_path, required).inspect_err(|e| {
        error!(path = %config_path.display(), error = %e, "Failed to load configuration");
    })?;
    if let Some(output) = args.output {
        config.output.html_path = output;
    }
    if args.json_output.is_some() {
        config.output.json_path = args.json_output;
    }

    // Early check: ensure output locations are writable before any network work
    let mut targets = vec![config.output.html_path.clone()];
    targets.extend(config.output.json_path.clone());
    for target in &targets {
        if let Err(e) = ensure_writable_parent(Path::new(target)).await {
            error!(
                path = %target,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Build services ----
    let source = NaverClient::new(
        &config.source,
        args.naver_client_id,
        args.naver_client_secret,
    )?;
    let gateway = RetryGenerate::new(
        GeminiClient::new(&config.gateway, args.gemini_api_key)?,
        RetryPolicy::from_config(&config.gateway),
    );
    let fetcher = HttpFetcher::new(std::time::Duration::from_secs(config.enrich.fetch_timeout_secs))?;
    info!(
        model = %config.gateway.model,
        keywords = ?config.keywords,
        content_mode = ?config.enrich.content_mode,
        "Services initialized"
    );

    // ---- Run ----
    let now = local_now(config.utc_offset_hours);
    let pipeline = Pipeline::new(&source, &gateway, &fetcher, &config);
    let report = match run_and_write(&pipeline, now, &config.output).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed; no report written");
            return Err(e);
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs(),
        elapsed_ms = elapsed.as_millis(),
        sections = report.sections.len(),
        articles = report.article_count(),
        html = %config.output.html_path,
        "news_briefing completed successfully"
    );

    Ok(())
}
