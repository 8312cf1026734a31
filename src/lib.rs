//! Snap Voca - backend for photo-to-wordbook vocabulary learning
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Wordbooks, words, study sessions, stats, profile         │
//! │  - Community discussions and shared wordbooks               │
//! │  - OCR ingestion and term analysis                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Ownership/authorship checks, validation                  │
//! │  - OCR filter pipeline, model orchestration                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Translation cache (moka)                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `ocr`: Text detection, vocabulary filter, translation
//! - `analysis`: Term extraction with a generative model
//! - `data`: Database and cache layer
//! - `auth`: Bearer token authentication
//! - `config`: Configuration management
//! - `error`: Error types

pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod ocr;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// This struct is cloned for each request. Optional integrations are
/// `None` when their API key is not configured.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// ID token verification
    pub identity: Arc<dyn auth::IdentityProvider>,

    /// Text detection (Google Cloud Vision)
    pub detector: Option<Arc<dyn ocr::TextDetector>>,

    /// Word translation (DeepL)
    pub translator: Option<Arc<dyn ocr::Translator>>,

    /// Dictionary, stopwords, lemmatizer
    pub lexicon: Arc<ocr::Lexicon>,

    /// Translated meanings (volatile)
    pub translation_cache: Arc<data::TranslationCache>,

    /// Term extraction (Gemini)
    pub analyzer: Option<Arc<analysis::TermAnalyzer>>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Load the dictionary
    /// 3. Initialize caches and HTTP client
    /// 4. Build the upstream integrations that have keys
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 2. Load dictionary
        let lexicon = ocr::Lexicon::load(config.ocr.dictionary_path.as_deref())?;

        // 3. Initialize caches and HTTP client
        let translation_cache = data::TranslationCache::new(
            config.translation.cache_max_items,
            Duration::from_secs(config.translation.cache_ttl_seconds),
        );
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("SnapVoca/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        // 4. Upstream integrations
        let identity: Arc<dyn auth::IdentityProvider> =
            Arc::new(auth::HmacIdentityProvider::new(&config.auth.token_secret));

        let detector = config.ocr.vision_api_key.as_deref().map(|key| {
            Arc::new(ocr::VisionTextDetector::new(
                http_client.clone(),
                &config.ocr.vision_endpoint,
                key,
            )) as Arc<dyn ocr::TextDetector>
        });

        let translator = config.translation.auth_key.as_deref().map(|key| {
            Arc::new(ocr::DeepLTranslator::new(
                http_client.clone(),
                &config.translation.endpoint,
                key,
            )) as Arc<dyn ocr::Translator>
        });
        if translator.is_none() {
            tracing::warn!("translation.auth_key is not set; meanings fall back to the lemma");
        }

        let analyzer = config.analysis.api_key.as_deref().map(|key| {
            let model = analysis::GeminiModel::new(
                http_client.clone(),
                &config.analysis.endpoint,
                key,
                Duration::from_secs(config.analysis.timeout_seconds),
            );
            Arc::new(analysis::TermAnalyzer::new(
                Arc::new(model),
                config.analysis.models.clone(),
                config.analysis.chunk_size,
                config.analysis.max_retries,
            ))
        });
        if analyzer.is_none() {
            tracing::warn!("analysis.api_key is not set; /api/gemini-analysis will answer 503");
        }

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            identity,
            detector,
            translator,
            lexicon: Arc::new(lexicon),
            translation_cache: Arc::new(translation_cache),
            analyzer,
        })
    }

    /// OCR service, if text detection is configured
    pub fn ocr_service(&self) -> Result<ocr::OcrService, error::AppError> {
        let detector = self.detector.clone().ok_or_else(|| {
            error::AppError::Unavailable("Text detection is not configured".to_string())
        })?;

        Ok(ocr::OcrService::new(
            detector,
            self.lexicon.clone(),
            ocr::MeaningResolver::new(
                self.translator.clone(),
                self.translation_cache.clone(),
                &self.config.translation.target_lang,
            ),
            self.config.ocr.max_image_bytes,
        ))
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .route_layer(middleware::from_fn(api::track_http_metrics))
        .layer(axum::extract::DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if server.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Liveness that also checks the database answers
async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<&'static str, error::AppError> {
    state.db.ping().await?;
    Ok("OK")
}
