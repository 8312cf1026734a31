//! Vocabulary filter over detected tokens
//!
//! Clean, drop noise, stopwords and unknown words, lemmatize, then keep the
//! first token of every lemma.

use std::collections::HashSet;

use super::lexicon::Lexicon;
use super::provider::DetectedText;

/// A token that survived the filter
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub lemma: String,
    /// Cleaned token as it appeared in the image
    pub original: String,
    pub confidence: f32,
}

/// Keep ASCII letters only, lowercased
pub fn clean_token(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Missing or zero confidence counts as certain
fn confidence_of(token: &DetectedText) -> f32 {
    match token.confidence {
        Some(c) if c != 0.0 => c,
        _ => 1.0,
    }
}

/// Run the filter over word tokens (the full-text annotation excluded)
pub fn select_vocabulary(tokens: &[DetectedText], lexicon: &Lexicon) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for token in tokens {
        let cleaned = clean_token(&token.description);
        if cleaned.is_empty() {
            continue;
        }
        if cleaned.len() <= 1 && cleaned != "a" && cleaned != "i" {
            continue;
        }
        if lexicon.is_stopword(&cleaned) {
            continue;
        }

        // Inflected forms count as known through their lemma
        let lemma = lexicon.lemma(&cleaned);
        if !lexicon.is_known(&cleaned) && !lexicon.is_known(&lemma) {
            continue;
        }
        if seen.insert(lemma.clone()) {
            selected.push(Candidate {
                lemma,
                confidence: confidence_of(token),
                original: cleaned,
            });
        }
    }

    selected
}
