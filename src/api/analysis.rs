//! Term analysis endpoint

use axum::{extract::State, response::Json};
use serde::Deserialize;

use super::ApiJson;
use crate::AppState;
use crate::analysis::Term;
use crate::auth::CurrentUser;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub text: Option<String>,
}

/// POST /api/gemini-analysis
pub async fn analyze_text(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<AnalysisRequest>,
) -> Result<Json<Vec<Term>>, AppError> {
    let text = request
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::Validation("text is required".to_string()))?;

    let analyzer = state.analyzer.clone().ok_or_else(|| {
        AppError::Unavailable("Term analysis is not configured".to_string())
    })?;

    tracing::debug!(user_id = %user.uid, chars = text.chars().count(), "Analysis request");
    Ok(Json(analyzer.analyze(&text).await?))
}
