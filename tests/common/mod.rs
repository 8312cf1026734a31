//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use snapvoca::analysis::{Backoff, ModelError, TermAnalyzer, TermModel};
use snapvoca::auth::{IdTokenClaims, create_id_token};
use snapvoca::error::AppError;
use snapvoca::ocr::{DetectedText, Lexicon, TextDetector, Translator};
use snapvoca::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TOKEN_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Words the fake dictionary knows
pub const DICTIONARY: &[&str] = &[
    "apple", "apples", "tree", "trees", "run", "running", "book", "books", "river",
];

/// Detector that always reports the same annotations
pub struct FakeDetector(pub Vec<DetectedText>);

#[async_trait]
impl TextDetector for FakeDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<DetectedText>, AppError> {
        Ok(self.0.clone())
    }
}

/// Translator with a tiny fixed vocabulary
pub struct FakeTranslator;

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(
        &self,
        texts: &[String],
        _target_lang: &str,
    ) -> Result<Vec<Option<String>>, AppError> {
        Ok(texts
            .iter()
            .map(|t| match t.as_str() {
                "apple" => Some("사과".to_string()),
                "tree" => Some("나무".to_string()),
                _ => None,
            })
            .collect())
    }
}

/// Model that returns one term per distinct word of the chunk
pub struct FakeModel;

#[async_trait]
impl TermModel for FakeModel {
    async fn call(&self, _model: &str, text: &str) -> Result<Option<Value>, ModelError> {
        let terms: Vec<Value> = text
            .split_whitespace()
            .map(|word| {
                json!({
                    "original": word.to_lowercase(),
                    "text": word,
                    "partOfSpeech": "n",
                    "meaning": format!("뜻:{}", word.to_lowercase()),
                })
            })
            .collect();
        Ok(Some(json!({ "terms": terms })))
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Server with fake OCR, translation and analysis providers
    pub async fn new() -> Self {
        Self::build(true, true).await
    }

    /// Fake providers, but the dictionary the default config loads
    pub async fn with_builtin_dictionary() -> Self {
        Self::build(true, false).await
    }

    /// Server with no upstream integrations configured
    pub async fn without_integrations() -> Self {
        Self::build(false, false).await
    }

    async fn build(with_integrations: bool, fake_dictionary: bool) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = test_config(db_path);
        let mut state = AppState::new(config).await.unwrap();

        if with_integrations {
            state.detector = Some(Arc::new(FakeDetector(vec![
                DetectedText::new("The apples fall from trees, running!"),
                DetectedText::new("The"),
                DetectedText::new("apples"),
                DetectedText {
                    description: "Apple".to_string(),
                    confidence: Some(0.4),
                },
                DetectedText {
                    description: "trees,".to_string(),
                    confidence: Some(0.8),
                },
                DetectedText::new("running!"),
                DetectedText::new("x"),
                DetectedText::new("qwzx"),
            ])));
            state.translator = Some(Arc::new(FakeTranslator));
            state.analyzer = Some(Arc::new(
                TermAnalyzer::new(Arc::new(FakeModel), vec!["fake".to_string()], 2000, 0)
                    .with_backoff(Backoff {
                        base: Duration::ZERO,
                        max: Duration::ZERO,
                        jitter: Duration::ZERO,
                    }),
            ));
        } else {
            state.detector = None;
            state.translator = None;
            state.analyzer = None;
        }
        if fake_dictionary {
            state.lexicon = Arc::new(Lexicon::with_dictionary(DICTIONARY.iter().copied()));
        }

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = snapvoca::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Bearer token for `uid`, with a display name and email
    pub fn token_for(&self, uid: &str, name: &str) -> String {
        let mut claims = IdTokenClaims::new(uid, 3600);
        claims.name = Some(name.to_string());
        claims.email = Some(format!("{uid}@example.com"));
        create_id_token(&claims, TOKEN_SECRET).unwrap()
    }

    pub fn expired_token(&self, uid: &str) -> String {
        let mut claims = IdTokenClaims::new(uid, 3600);
        claims.iat -= 7200;
        claims.exp -= 7200;
        create_id_token(&claims, TOKEN_SECRET).unwrap()
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Create a wordbook and return its id
    pub async fn create_wordbook(&self, token: &str, name: &str) -> String {
        let response = self
            .post("/api/wordbooks", Some(token), json!({ "name": name }))
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    /// Add a word and return its id
    pub async fn add_word(&self, token: &str, wordbook_id: &str, word: &str) -> String {
        let response = self
            .post(
                &format!("/api/wordbooks/{wordbook_id}/words"),
                Some(token),
                json!({ "word": word, "meaning": format!("{word} meaning") }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn get_json(&self, path: &str, token: Option<&str>) -> Value {
        let response = self.get(path, token).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.json().await.unwrap()
    }
}

fn test_config(db_path: std::path::PathBuf) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            allowed_origins: vec![],
            body_limit_bytes: 1024 * 1024,
        },
        database: config::DatabaseConfig { path: db_path },
        auth: config::AuthConfig {
            token_secret: TOKEN_SECRET.to_string(),
            token_max_age: 3600,
        },
        ocr: config::OcrConfig {
            vision_endpoint: "http://127.0.0.1:9/v1/images:annotate".to_string(),
            vision_api_key: None,
            dictionary_path: None,
            max_image_bytes: 64 * 1024,
        },
        translation: config::TranslationConfig {
            endpoint: "http://127.0.0.1:9/v2/translate".to_string(),
            auth_key: None,
            target_lang: "KO".to_string(),
            cache_max_items: 1000,
            cache_ttl_seconds: 60,
        },
        analysis: config::AnalysisConfig {
            endpoint: "http://127.0.0.1:9/v1beta".to_string(),
            api_key: None,
            models: vec!["fake".to_string()],
            chunk_size: 2000,
            timeout_seconds: 5,
            max_retries: 0,
        },
        stats: config::StatsConfig { utc_offset_hours: 9 },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
