//! Minimum spacing between consecutive model calls.

use crate::error::GatewayError;
use crate::gateway::{Generate, GenerateOptions};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Gateway decorator that waits at least `min_interval` after the previous
/// call finished before starting the next one.
///
/// The lock is held for the duration of a call, so calls through one
/// `Paced` never overlap.
#[derive(Debug)]
pub struct Paced<G> {
    inner: G,
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl<G: Generate> Paced<G> {
    pub fn new(inner: G, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last: Mutex::new(None),
        }
    }
}

impl<G: Generate> Generate for Paced<G> {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError> {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis(), "Pacing model call");
                sleep_until(ready_at).await;
            }
        }
        let result = self.inner.generate(prompt, options).await;
        *last = Some(Instant::now());
        result
    }
}
