//! In-memory caches
//!
//! These caches are volatile and cleared on restart.
//! Uses Moka for high-performance concurrent caching.

use moka::future::Cache;
use std::collections::HashMap;
use std::time::Duration;

const CACHE_NAME: &str = "translation";

// =============================================================================
// Translation Cache
// =============================================================================

/// Translated meanings keyed by target language and lemma
///
/// Lemmas are looked up lowercase; OCR output is already normalized.
pub struct TranslationCache {
    /// "KO:apple" -> "사과"
    meanings: Cache<String, String>,
}

impl TranslationCache {
    /// Create new translation cache
    ///
    /// # Arguments
    /// * `max_items` - Maximum number of cached meanings
    /// * `ttl` - How long a meaning stays valid
    pub fn new(max_items: u64, ttl: Duration) -> Self {
        let meanings = Cache::builder()
            .max_capacity(max_items)
            .time_to_live(ttl)
            .build();

        Self { meanings }
    }

    fn key(target_lang: &str, lemma: &str) -> String {
        format!("{}:{}", target_lang.to_ascii_uppercase(), lemma)
    }

    /// Look up several lemmas at once
    ///
    /// Returns the cached meanings and the lemmas still to translate,
    /// in input order.
    pub async fn get_many(
        &self,
        target_lang: &str,
        lemmas: &[String],
    ) -> (HashMap<String, String>, Vec<String>) {
        use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};

        let mut found = HashMap::new();
        let mut missing = Vec::new();

        for lemma in lemmas {
            match self.meanings.get(&Self::key(target_lang, lemma)).await {
                Some(meaning) => {
                    CACHE_HITS_TOTAL.with_label_values(&[CACHE_NAME]).inc();
                    found.insert(lemma.clone(), meaning);
                }
                None => {
                    CACHE_MISSES_TOTAL.with_label_values(&[CACHE_NAME]).inc();
                    missing.push(lemma.clone());
                }
            }
        }

        (found, missing)
    }

    pub async fn insert(&self, target_lang: &str, lemma: &str, meaning: String) {
        self.meanings
            .insert(Self::key(target_lang, lemma), meaning)
            .await;
    }

    /// Number of cached meanings (approximate until pending tasks run)
    pub fn entry_count(&self) -> u64 {
        self.meanings.entry_count()
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(50_000, Duration::from_secs(7 * 86_400))
    }
}
