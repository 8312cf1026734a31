//! OCR ingestion
//!
//! Turns a photographed page into vocabulary candidates:
//!
//! ```text
//! base64 image -> TextDetector -> filter (clean, stopwords, dictionary,
//!                                 lemmatize, dedupe) -> MeaningResolver
//! ```

mod filter;
mod lexicon;
mod provider;
mod translate;

pub use filter::{Candidate, clean_token, select_vocabulary};
pub use lexicon::Lexicon;
pub use provider::{DetectedText, TextDetector, VisionTextDetector};
pub use translate::{DeepLTranslator, MeaningResolver, Translator};

use std::sync::Arc;

use base64::Engine;
use serde::Serialize;

use crate::error::AppError;
use crate::metrics::{OCR_REQUESTS_TOTAL, OCR_WORDS_EXTRACTED_TOTAL};

/// A vocabulary word found in the image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrWord {
    /// Lemma
    pub text: String,
    pub original: String,
    pub confidence: f32,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub full_text: String,
    pub words: Vec<OcrWord>,
}

/// OCR ingestion service
pub struct OcrService {
    detector: Arc<dyn TextDetector>,
    lexicon: Arc<Lexicon>,
    meanings: MeaningResolver,
    max_image_bytes: usize,
}

impl OcrService {
    pub fn new(
        detector: Arc<dyn TextDetector>,
        lexicon: Arc<Lexicon>,
        meanings: MeaningResolver,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            detector,
            lexicon,
            meanings,
            max_image_bytes,
        }
    }

    /// Detect, filter and translate the words of a base64 image
    pub async fn ingest(&self, image: &str) -> Result<OcrResult, AppError> {
        let result = self.run(image).await;
        let status = if result.is_ok() { "success" } else { "error" };
        OCR_REQUESTS_TOTAL.with_label_values(&[status]).inc();
        result
    }

    async fn run(&self, image: &str) -> Result<OcrResult, AppError> {
        let bytes = decode_image(image, self.max_image_bytes)?;
        let annotations = self.detector.detect(&bytes).await?;

        let Some((full_text, tokens)) = annotations.split_first() else {
            return Ok(OcrResult {
                full_text: String::new(),
                words: Vec::new(),
            });
        };

        let candidates = select_vocabulary(tokens, &self.lexicon);
        if candidates.is_empty() {
            return Ok(OcrResult {
                full_text: full_text.description.clone(),
                words: Vec::new(),
            });
        }

        let lemmas: Vec<String> = candidates.iter().map(|c| c.lemma.clone()).collect();
        let meanings = self.meanings.meanings(&lemmas).await?;

        let words: Vec<OcrWord> = candidates
            .into_iter()
            .zip(meanings)
            .map(|(candidate, meaning)| OcrWord {
                text: candidate.lemma,
                original: candidate.original,
                confidence: candidate.confidence,
                meaning,
            })
            .collect();

        OCR_WORDS_EXTRACTED_TOTAL.inc_by(words.len() as u64);
        tracing::info!(
            tokens = tokens.len(),
            words = words.len(),
            "Image text processed"
        );

        Ok(OcrResult {
            full_text: full_text.description.clone(),
            words,
        })
    }
}

/// Decode base64 image data, with or without a `data:image/...;base64,` prefix
pub fn decode_image(image: &str, max_bytes: usize) -> Result<Vec<u8>, AppError> {
    let data = strip_data_url_prefix(image.trim());
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| AppError::Validation("image is not valid base64".to_string()))?;

    if bytes.is_empty() {
        return Err(AppError::Validation("image is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "image exceeds {} bytes",
            max_bytes
        )));
    }
    Ok(bytes)
}

fn strip_data_url_prefix(image: &str) -> &str {
    let Some(rest) = image.strip_prefix("data:image/") else {
        return image;
    };
    match rest.split_once(";base64,") {
        Some((kind, data)) if !kind.is_empty() && kind.chars().all(|c| c.is_alphanumeric() || c == '_') => {
            data
        }
        _ => image,
    }
}
