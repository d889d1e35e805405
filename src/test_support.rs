//! In-memory fakes for the source, gateway and fetcher seams.

use crate::enrich::content::ContentFetcher;
use crate::error::{EnrichError, GatewayError, SourceError};
use crate::gateway::{Generate, GenerateOptions};
use crate::models::{NormalizedRecord, RawRecord};
use crate::sources::NewsSource;
use chrono::NaiveDate;
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const PUB_DATE: &str = "Sun, 18 Oct 2026 09:30:00 +0900";

pub fn raw(title: &str, link: &str) -> RawRecord {
    raw_at(title, link, PUB_DATE)
}

pub fn raw_at(title: &str, link: &str, pub_date: &str) -> RawRecord {
    RawRecord {
        title: title.to_string(),
        link: link.to_string(),
        description: format!("{title} 스니펫"),
        pub_date: pub_date.to_string(),
    }
}

pub fn normalized(title: &str, link: &str) -> NormalizedRecord {
    normalized_with(title, link, &format!("{title} 스니펫"))
}

pub fn normalized_with(title: &str, link: &str, description: &str) -> NormalizedRecord {
    NormalizedRecord {
        title: title.to_string(),
        link: link.to_string(),
        description: description.to_string(),
        published_at: NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
    }
}

/// Source answering from a keyword table; `Err(())` simulates a failed query.
#[derive(Default)]
pub struct FakeSource {
    answers: HashMap<String, Result<Vec<RawRecord>, ()>>,
    queries: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyword: &str, answer: Result<Vec<RawRecord>, ()>) -> Self {
        self.answers.insert(keyword.to_string(), answer);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl NewsSource for FakeSource {
    async fn search(&self, keyword: &str) -> Result<Vec<RawRecord>, SourceError> {
        self.queries.lock().unwrap().push(keyword.to_string());
        match self.answers.get(keyword) {
            Some(Ok(records)) => Ok(records.clone()),
            _ => Err(SourceError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "fake failure".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Gateway replaying a fixed queue of responses.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    requests: Mutex<Vec<(String, GenerateOptions)>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(String, GenerateOptions)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Generate for ScriptedGateway {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError> {
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Empty("SCRIPT_EXHAUSTED".to_string())))
    }
}

type Responder = Box<dyn Fn(&str, &GenerateOptions) -> Result<String, GatewayError> + Send + Sync>;

/// Gateway answering through a closure, for tests with several call kinds.
pub struct FnGateway {
    respond: Responder,
    requests: Mutex<Vec<(String, GenerateOptions)>>,
}

impl FnGateway {
    pub fn new(
        respond: impl Fn(&str, &GenerateOptions) -> Result<String, GatewayError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(String, GenerateOptions)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Generate for FnGateway {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError> {
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        (self.respond)(prompt, options)
    }
}

/// Fetcher answering from a link table; unknown links fail with 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<String, ()>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, link: &str, page: Result<String, ()>) -> Self {
        self.pages.insert(link.to_string(), page);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, EnrichError> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(())) => Err(EnrichError::FetchStatus(StatusCode::INTERNAL_SERVER_ERROR)),
            None => Err(EnrichError::FetchStatus(StatusCode::NOT_FOUND)),
        }
    }
}
