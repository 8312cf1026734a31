//! API layer
//!
//! HTTP handlers for:
//! - Wordbooks, words, import/export
//! - Study sessions and learning statistics
//! - Community discussions and shared wordbooks
//! - User profiles
//! - OCR ingestion and term analysis
//! - Metrics (Prometheus)

mod analysis;
mod community;
mod discussions;
mod extract;
pub mod metrics;
mod ocr;
mod study;
mod users;
mod word;
mod wordbooks;

pub use extract::ApiJson;
pub use metrics::{metrics_router, track_http_metrics};

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::AppState;

/// Create the `/api` router
///
/// Authentication is enforced per handler by the `CurrentUser` extractor;
/// handlers without it are public.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Community discussions
        .route(
            "/community/discussions",
            get(discussions::list_discussions).post(discussions::create_discussion),
        )
        .route(
            "/community/discussions/:post_id",
            get(discussions::get_discussion)
                .put(discussions::update_discussion)
                .delete(discussions::delete_discussion),
        )
        .route(
            "/community/discussions/:post_id/like",
            post(discussions::toggle_like),
        )
        .route(
            "/community/discussions/:post_id/comments",
            get(discussions::list_comments).post(discussions::create_comment),
        )
        .route(
            "/community/discussions/:post_id/comments/:comment_id",
            put(discussions::update_comment).delete(discussions::delete_comment),
        )
        // Community wordbooks
        .route(
            "/community/wordbooks",
            get(community::list_community_wordbooks).post(community::share_wordbook),
        )
        .route(
            "/community/wordbooks/:id",
            get(community::get_community_wordbook),
        )
        .route(
            "/community/wordbooks/:id/like",
            post(community::toggle_like),
        )
        .route(
            "/community/wordbooks/:id/download",
            post(community::download),
        )
        // Wordbooks and words
        .route(
            "/wordbooks",
            get(wordbooks::list_wordbooks).post(wordbooks::create_wordbook),
        )
        .route("/wordbooks/move-words", post(wordbooks::move_words))
        .route(
            "/wordbooks/:id",
            get(wordbooks::get_wordbook)
                .put(wordbooks::update_wordbook)
                .delete(wordbooks::delete_wordbook),
        )
        .route("/wordbooks/:id/words", post(wordbooks::add_word))
        .route(
            "/wordbooks/:id/words/:word_id",
            put(wordbooks::update_word).delete(wordbooks::delete_word),
        )
        .route("/wordbooks/:id/export", get(wordbooks::export_wordbook))
        .route("/wordbooks/:id/import", post(wordbooks::import_words))
        // Study
        .route(
            "/study-sessions",
            get(study::list_sessions).post(study::create_session),
        )
        .route("/study-sessions/:id", get(study::get_session))
        .route("/learning-stats", get(study::learning_stats))
        // Users
        .route(
            "/user/profile",
            get(users::get_own_profile).put(users::update_profile),
        )
        .route("/user/:user_id/profile", get(users::get_public_profile))
        // Word lookup, OCR, analysis
        .route("/word", post(word::lookup_words))
        .route("/ocr", post(ocr::ingest_image))
        .route("/gemini-analysis", post(analysis::analyze_text))
}

/// Parse a JSON array body into `T`s; anything else is a 400
pub(crate) fn json_array<T: serde::de::DeserializeOwned>(
    body: serde_json::Value,
    what: &str,
) -> Result<Vec<T>, crate::error::AppError> {
    use crate::error::AppError;

    if !body.is_array() {
        return Err(AppError::Validation(format!("{what} must be an array")));
    }
    let items: Vec<T> = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("invalid {what}: {e}")))?;
    if items.is_empty() {
        return Err(AppError::Validation(format!("{what} must not be empty")));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::WordRef;
    use serde_json::json;

    #[test]
    fn json_array_rejects_non_arrays_and_empty() {
        assert!(json_array::<WordRef>(json!({"wordbookId": "a"}), "words").is_err());
        assert!(json_array::<WordRef>(json!([]), "words").is_err());
        assert!(json_array::<WordRef>(json!([{"wordbookId": 1}]), "words").is_err());

        let refs: Vec<WordRef> =
            json_array(json!([{"wordbookId": "a", "wordId": "b"}]), "words").unwrap();
        assert_eq!(refs[0].word_id, "b");
    }
}
