//! Term analysis with a generative model
//!
//! Long input is split into chunks handled one after another. Each chunk
//! walks the configured model list; each model call is retried with
//! exponential backoff while failures look transient.

mod gemini;
mod parse;

pub use gemini::GeminiModel;
pub use parse::{Term, dedupe_terms, parse_lenient_json, terms_from_args};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;

lazy_static! {
    static ref TRANSIENT_WORDING: Regex =
        Regex::new(r"(?i)overloaded|temporar|timeout|deadline|rate|quota|unavailable")
            .expect("valid regex");
}

/// A failed model call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ModelError {
    /// HTTP status, when the model answered
    pub status: Option<u16>,
    pub message: String,
}

impl ModelError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Worth retrying: rate limits, server errors, or overload wording
    pub fn is_transient(&self) -> bool {
        matches!(self.status, Some(429 | 500 | 502 | 503 | 504))
            || TRANSIENT_WORDING.is_match(&self.message)
    }
}

/// One call to a model
#[async_trait]
pub trait TermModel: Send + Sync {
    /// Arguments the model passed to `return_terms`, or `None` if it
    /// answered without calling it
    async fn call(&self, model: &str, text: &str) -> Result<Option<Value>, ModelError>;
}

/// Exponential backoff with random jitter
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(400),
            max: Duration::from_millis(6000),
            jitter: Duration::from_millis(250),
        }
    }
}

impl Backoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponential = self.base.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_ms)
        };
        exponential.min(self.max) + Duration::from_millis(jitter)
    }
}

/// Term analyzer
pub struct TermAnalyzer {
    model: Arc<dyn TermModel>,
    models: Vec<String>,
    chunk_size: usize,
    max_retries: u32,
    backoff: Backoff,
}

impl TermAnalyzer {
    pub fn new(
        model: Arc<dyn TermModel>,
        models: Vec<String>,
        chunk_size: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            model,
            models,
            chunk_size: chunk_size.max(1),
            max_retries,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Extract vocabulary terms from `text`
    pub async fn analyze(&self, text: &str) -> Result<Vec<Term>, AppError> {
        let chunks = split_chunks(text, self.chunk_size);
        let mut terms = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let found = self.analyze_chunk(chunk).await.map_err(|e| {
                tracing::warn!(chunk = index, error = %e, "Term analysis failed");
                AppError::Upstream(format!("term analysis failed: {}", e))
            })?;
            terms.extend(found);
        }

        let terms = dedupe_terms(terms);
        tracing::info!(chunks = chunks.len(), terms = terms.len(), "Text analyzed");
        Ok(terms)
    }

    /// Try each model in turn; stop at the first non-transient failure
    async fn analyze_chunk(&self, chunk: &str) -> Result<Vec<Term>, ModelError> {
        let mut last_error = ModelError::new(None, "no models configured");

        for model in &self.models {
            match self.call_with_retry(model, chunk).await {
                Ok(None) => {
                    tracing::debug!(model = %model, "Model answered without a function call");
                    return Ok(Vec::new());
                }
                Ok(Some(args)) => return decode_args(args),
                Err(e) => {
                    let transient = e.is_transient();
                    tracing::warn!(model = %model, error = %e, transient, "Model call failed");
                    last_error = e;
                    if !transient {
                        break;
                    }
                }
            }
        }
        Err(last_error)
    }

    async fn call_with_retry(&self, model: &str, chunk: &str) -> Result<Option<Value>, ModelError> {
        let mut attempt = 0;
        loop {
            match self.model.call(model, chunk).await {
                Ok(args) => return Ok(args),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.delay(attempt);
                    tracing::debug!(model = %model, attempt, delay_ms = delay.as_millis() as u64, "Retrying model call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Arguments are an object, or a JSON string that may need repair
fn decode_args(args: Value) -> Result<Vec<Term>, ModelError> {
    let args = match args {
        Value::String(raw) => parse_lenient_json(&raw)
            .ok_or_else(|| ModelError::new(None, "Failed to parse tool arguments as JSON"))?,
        other => other,
    };
    Ok(terms_from_args(&args))
}

/// Split on character boundaries into pieces of at most `max` characters
fn split_chunks(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max {
        return vec![text.to_string()];
    }
    chars.chunks(max).map(|c| c.iter().collect()).collect()
}
