//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ocr: OcrConfig,
    pub translation: TranslationConfig,
    pub analysis: AnalysisConfig,
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Origins allowed by CORS; empty means permissive (development)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Maximum request body size in bytes
    pub body_limit_bytes: usize,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// ID token verification
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the token issuer (32+ bytes)
    pub token_secret: String,
    /// Token lifetime in seconds, used when minting tokens
    pub token_max_age: i64,
}

/// Text detection (Google Cloud Vision REST API)
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// e.g. "https://vision.googleapis.com/v1/images:annotate"
    pub vision_endpoint: String,
    pub vision_api_key: Option<String>,
    /// Word list, one word per line. Without it the built-in list is used.
    pub dictionary_path: Option<PathBuf>,
    /// Maximum decoded image size
    pub max_image_bytes: usize,
}

/// Word translation (DeepL REST API)
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    /// e.g. "https://api-free.deepl.com/v2/translate"
    pub endpoint: String,
    /// Without a key, meanings fall back to the lemma itself
    pub auth_key: Option<String>,
    /// Target language code (default: "KO")
    pub target_lang: String,
    pub cache_max_items: u64,
    pub cache_ttl_seconds: u64,
}

/// Term extraction with a generative model (Gemini REST API)
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Base URL, e.g. "https://generativelanguage.googleapis.com/v1beta"
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Models tried in order when one is overloaded
    pub models: Vec<String>,
    /// Maximum characters per request
    pub chunk_size: usize,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

/// Learning statistics
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Offset of the learner's local day from UTC (default: +9, KST)
    pub utc_offset_hours: i32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SNAPVOCA__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.body_limit_bytes", 15 * 1024 * 1024)?
            .set_default("database.path", "data/snapvoca.db")?
            .set_default("auth.token_max_age", 3600)?
            .set_default(
                "ocr.vision_endpoint",
                "https://vision.googleapis.com/v1/images:annotate",
            )?
            .set_default("ocr.max_image_bytes", 10 * 1024 * 1024)?
            .set_default("translation.endpoint", "https://api-free.deepl.com/v2/translate")?
            .set_default("translation.target_lang", "KO")?
            .set_default("translation.cache_max_items", 50_000)?
            .set_default("translation.cache_ttl_seconds", 7 * 86_400)?
            .set_default(
                "analysis.endpoint",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default(
                "analysis.models",
                vec![
                    "gemini-2.5-flash",
                    "gemini-2.5-pro",
                    "gemini-1.5-pro-001",
                    "gemini-1.5-flash-001",
                ],
            )?
            .set_default("analysis.chunk_size", 2000)?
            .set_default("analysis.timeout_seconds", 25)?
            .set_default("analysis.max_retries", 4)?
            .set_default("stats.utc_offset_hours", 9)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("SNAPVOCA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("analysis.models")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_TOKEN_SECRET_BYTES: usize = 32;

        if self.auth.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_TOKEN_SECRET_BYTES
            )));
        }

        if self.auth.token_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.token_max_age must be greater than 0".to_string(),
            ));
        }

        for (key, endpoint) in [
            ("ocr.vision_endpoint", &self.ocr.vision_endpoint),
            ("translation.endpoint", &self.translation.endpoint),
            ("analysis.endpoint", &self.analysis.endpoint),
        ] {
            url::Url::parse(endpoint).map_err(|e| {
                crate::error::AppError::Config(format!("{key} is not a valid URL: {e}"))
            })?;
        }

        if self.analysis.chunk_size == 0 {
            return Err(crate::error::AppError::Config(
                "analysis.chunk_size must be greater than 0".to_string(),
            ));
        }

        if !(-12..=14).contains(&self.stats.utc_offset_hours) {
            return Err(crate::error::AppError::Config(
                "stats.utc_offset_hours must be between -12 and 14".to_string(),
            ));
        }

        if self.ocr.vision_api_key.is_none() {
            tracing::warn!("ocr.vision_api_key is not set; /api/ocr will answer 503");
        }

        Ok(())
    }
}
