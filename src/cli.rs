//! Command-line interface definitions.
//!
//! Every flag is optional except the three API credentials, and those can
//! come from environment variables instead. Output paths given here take
//! precedence over the `output` section of the config file.

use clap::Parser;
use std::path::PathBuf;

/// Config file read when `--config` is not given. It may be absent.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Command-line arguments for the briefing run.
///
/// # Examples
///
/// ```sh
/// # Credentials from the environment, everything else from config.yaml
/// NAVER_CLIENT_ID=... NAVER_CLIENT_SECRET=... GEMINI_API_KEY=... news_briefing
///
/// # Explicit config and output locations
/// news_briefing -c briefing.yaml -o public/index.html --json-output public/report.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file (default: ./config.yaml, if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the HTML report
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also write the report as JSON to this path
    #[arg(long)]
    pub json_output: Option<String>,

    /// Naver Open API client id
    #[arg(long, env = "NAVER_CLIENT_ID", hide_env_values = true)]
    pub naver_client_id: String,

    /// Naver Open API client secret
    #[arg(long, env = "NAVER_CLIENT_SECRET", hide_env_values = true)]
    pub naver_client_secret: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,
}

impl Cli {
    /// The config path to load and whether it must exist.
    pub fn config_source(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }
}
