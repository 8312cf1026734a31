//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snapvoca_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "snapvoca_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // OCR Metrics
    pub static ref OCR_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snapvoca_ocr_requests_total", "Total number of text detection requests"),
        &["status"]
    ).expect("metric can be created");
    pub static ref OCR_WORDS_EXTRACTED_TOTAL: IntCounter = IntCounter::new(
        "snapvoca_ocr_words_extracted_total",
        "Total number of vocabulary words returned by OCR ingestion"
    ).expect("metric can be created");

    // Upstream Metrics
    pub static ref UPSTREAM_CALLS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snapvoca_upstream_calls_total", "Total number of calls to external APIs"),
        &["service", "status"]
    ).expect("metric can be created");

    // Cache Metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snapvoca_cache_hits_total", "Total number of cache hits"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snapvoca_cache_misses_total", "Total number of cache misses"),
        &["cache_name"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snapvoca_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(OCR_REQUESTS_TOTAL.clone()))
        .expect("OCR_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(OCR_WORDS_EXTRACTED_TOTAL.clone()))
        .expect("OCR_WORDS_EXTRACTED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPSTREAM_CALLS_TOTAL.clone()))
        .expect("UPSTREAM_CALLS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_HITS_TOTAL.clone()))
        .expect("CACHE_HITS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_MISSES_TOTAL.clone()))
        .expect("CACHE_MISSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record a finished HTTP request.
pub fn observe_http_request(method: &str, endpoint: &str, status: u16, elapsed_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(elapsed_secs);
}

/// Record one call to an external API.
pub fn observe_upstream_call(service: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    UPSTREAM_CALLS_TOTAL
        .with_label_values(&[service, status])
        .inc();
}
