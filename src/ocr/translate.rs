//! Meaning lookup
//!
//! Lemmas are translated in batches through a [`Translator`], with results
//! kept in the [`TranslationCache`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;

use crate::data::TranslationCache;
use crate::error::AppError;
use crate::metrics::observe_upstream_call;

/// DeepL accepts at most 50 texts per request
const MAX_BATCH: usize = 50;
const MAX_CONCURRENT_BATCHES: usize = 4;

/// Translator trait
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate every text; the result has the same length and order as
    /// `texts`, with `None` where no translation came back.
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<Option<String>>, AppError>;
}

/// DeepL `/v2/translate`
pub struct DeepLTranslator {
    client: reqwest::Client,
    endpoint: String,
    auth_key: String,
}

impl DeepLTranslator {
    pub fn new(client: reqwest::Client, endpoint: &str, auth_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            auth_key: auth_key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: Option<String>,
}

impl DeepLTranslator {
    async fn translate_batch(
        &self,
        batch: &[String],
        target_lang: &str,
    ) -> Result<Vec<Option<String>>, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.auth_key))
            .json(&serde_json::json!({
                "text": batch,
                "target_lang": target_lang,
            }))
            .send()
            .await
            .inspect_err(|_| observe_upstream_call("deepl", false))?;

        if !response.status().is_success() {
            observe_upstream_call("deepl", false);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "DeepL returned {}: {}",
                status, body
            )));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .inspect_err(|_| observe_upstream_call("deepl", false))?;
        observe_upstream_call("deepl", true);

        let mut translations = parsed.translations.into_iter();
        Ok(batch
            .iter()
            .map(|_| {
                translations
                    .next()
                    .and_then(|t| t.text)
                    .filter(|t| !t.trim().is_empty())
            })
            .collect())
    }
}

#[async_trait]
impl Translator for DeepLTranslator {
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<Option<String>>, AppError> {
        let requests: Vec<_> = texts
            .chunks(MAX_BATCH)
            .map(|batch| self.translate_batch(batch, target_lang))
            .collect();

        // Batches run concurrently; `buffered` keeps their order
        let batches: Vec<Vec<Option<String>>> = stream::iter(requests)
            .buffered(MAX_CONCURRENT_BATCHES)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Cached, batched meanings for lemmas
pub struct MeaningResolver {
    translator: Option<Arc<dyn Translator>>,
    cache: Arc<TranslationCache>,
    target_lang: String,
}

impl MeaningResolver {
    pub fn new(
        translator: Option<Arc<dyn Translator>>,
        cache: Arc<TranslationCache>,
        target_lang: &str,
    ) -> Self {
        Self {
            translator,
            cache,
            target_lang: target_lang.to_string(),
        }
    }

    /// One meaning per lemma, in order; the lemma itself when untranslated
    pub async fn meanings(&self, lemmas: &[String]) -> Result<Vec<String>, AppError> {
        let Some(translator) = &self.translator else {
            return Ok(lemmas.to_vec());
        };

        let (mut known, missing) = self.cache.get_many(&self.target_lang, lemmas).await;

        if !missing.is_empty() {
            let translated = translator.translate(&missing, &self.target_lang).await?;
            for (lemma, meaning) in missing.iter().zip(translated) {
                if let Some(meaning) = meaning {
                    self.cache
                        .insert(&self.target_lang, lemma, meaning.clone())
                        .await;
                    known.insert(lemma.clone(), meaning);
                }
            }
            tracing::debug!(
                requested = missing.len(),
                target_lang = %self.target_lang,
                "Lemmas translated"
            );
        }

        Ok(lemmas
            .iter()
            .map(|lemma| known.get(lemma).cloned().unwrap_or_else(|| lemma.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Uppercase {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for Uppercase {
        async fn translate(
            &self,
            texts: &[String],
            _target_lang: &str,
        ) -> Result<Vec<Option<String>>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| (t != "skip").then(|| t.to_uppercase()))
                .collect())
        }
    }

    fn lemmas(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    /// DeepL stand-in that upper-cases texts and answers the first batch last
    async fn spawn_deepl(requests: Arc<AtomicUsize>) -> String {
        use axum::{Json, Router, routing::post};
        use serde_json::{Value, json};

        let app = Router::new().route(
            "/v2/translate",
            post(move |Json(body): Json<Value>| {
                let requests = requests.clone();
                async move {
                    requests.fetch_add(1, Ordering::SeqCst);
                    let texts: Vec<String> = body["text"]
                        .as_array()
                        .map(|texts| {
                            texts
                                .iter()
                                .filter_map(|t| t.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                    if texts.first().map(String::as_str) == Some("w0") {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                    let translations: Vec<Value> = texts
                        .iter()
                        .map(|t| json!({ "text": t.to_uppercase() }))
                        .collect();
                    Json(json!({ "translations": translations }))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v2/translate")
    }

    #[tokio::test]
    async fn deepl_splits_into_batches_and_keeps_order() {
        let requests = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_deepl(requests.clone()).await;
        let translator = DeepLTranslator::new(reqwest::Client::new(), &endpoint, "key");

        let texts: Vec<String> = (0..120).map(|i| format!("w{i}")).collect();
        let translated = translator.translate(&texts, "KO").await.unwrap();

        assert_eq!(requests.load(Ordering::SeqCst), 3);
        let expected: Vec<Option<String>> = (0..120).map(|i| Some(format!("W{i}"))).collect();
        assert_eq!(translated, expected);
    }

    #[tokio::test]
    async fn deepl_surfaces_upstream_errors() {
        let translator = DeepLTranslator::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/v2/translate",
            "key",
        );
        let result = translator.translate(&lemmas(&["apple"]), "KO").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn falls_back_to_lemma_without_translator() {
        let resolver = MeaningResolver::new(None, Arc::new(TranslationCache::default()), "KO");
        let meanings = resolver.meanings(&lemmas(&["apple"])).await.unwrap();
        assert_eq!(meanings, vec!["apple".to_string()]);
    }

    #[tokio::test]
    async fn translates_misses_once_and_caches() {
        let translator = Arc::new(Uppercase {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(TranslationCache::new(100, Duration::from_secs(60)));
        let resolver = MeaningResolver::new(Some(translator.clone()), cache, "KO");

        let first = resolver
            .meanings(&lemmas(&["apple", "skip"]))
            .await
            .unwrap();
        assert_eq!(first, lemmas(&["APPLE", "skip"]));

        let second = resolver.meanings(&lemmas(&["apple"])).await.unwrap();
        assert_eq!(second, lemmas(&["APPLE"]));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }
}
