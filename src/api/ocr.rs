//! OCR ingestion endpoint

use axum::{extract::State, response::Json};
use serde::Deserialize;

use super::ApiJson;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::ocr::OcrResult;

#[derive(Debug, Deserialize)]
pub struct OcrRequest {
    /// Base64, optionally as a `data:image/...;base64,` URL
    pub image: Option<String>,
}

/// POST /api/ocr
pub async fn ingest_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<OcrRequest>,
) -> Result<Json<OcrResult>, AppError> {
    let image = request
        .image
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| AppError::Validation("image is required".to_string()))?;

    tracing::debug!(user_id = %user.uid, encoded_len = image.len(), "OCR request");
    let result = state.ocr_service()?.ingest(&image).await?;
    Ok(Json(result))
}
