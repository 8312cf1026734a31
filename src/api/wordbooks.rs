//! Wordbook and word endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use super::{ApiJson, json_array};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Word, WordPatch, Wordbook};
use crate::error::AppError;
use crate::service::{
    ImportedWord, MoveWords, NewWord, NewWordbook, WordbookDetail, WordbookPatch, WordbookService,
};

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct WordUpdatedResponse {
    pub message: String,
    pub word: Word,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedResponse {
    pub message: String,
    pub moved_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedResponse {
    pub message: String,
    pub imported_count: usize,
}

fn service(state: &AppState) -> WordbookService {
    WordbookService::new(state.db.clone())
}

/// GET /api/wordbooks
pub async fn list_wordbooks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Wordbook>>, AppError> {
    Ok(Json(service(&state).list(&user.uid).await?))
}

/// POST /api/wordbooks
pub async fn create_wordbook(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<NewWordbook>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let wordbook = service(&state).create(&user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: wordbook.id,
            message: "Wordbook created".to_string(),
        }),
    ))
}

/// GET /api/wordbooks/:id
pub async fn get_wordbook(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<WordbookDetail>, AppError> {
    Ok(Json(service(&state).open(&user.uid, &id).await?))
}

/// PUT /api/wordbooks/:id
pub async fn update_wordbook(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<WordbookPatch>,
) -> Result<Json<Wordbook>, AppError> {
    Ok(Json(service(&state).update(&user.uid, &id, patch).await?))
}

/// DELETE /api/wordbooks/:id
pub async fn delete_wordbook(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service(&state).delete(&user.uid, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/wordbooks/:id/words
pub async fn add_word(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewWord>,
) -> Result<(StatusCode, Json<Word>), AppError> {
    let word = service(&state).add_word(&user.uid, &id, input).await?;
    Ok((StatusCode::CREATED, Json(word)))
}

/// PUT /api/wordbooks/:id/words/:word_id
pub async fn update_word(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, word_id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<WordPatch>,
) -> Result<Json<WordUpdatedResponse>, AppError> {
    let word = service(&state)
        .update_word(&user.uid, &id, &word_id, patch)
        .await?;
    Ok(Json(WordUpdatedResponse {
        message: "Word updated".to_string(),
        word,
    }))
}

/// DELETE /api/wordbooks/:id/words/:word_id
pub async fn delete_word(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, word_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    service(&state).delete_word(&user.uid, &id, &word_id).await?;
    Ok(Json(MessageResponse {
        message: "Word deleted".to_string(),
    }))
}

/// POST /api/wordbooks/move-words
pub async fn move_words(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<MovedResponse>, AppError> {
    let input: MoveWords = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("invalid move request: {e}")))?;
    let moved_count = service(&state).move_words(&user.uid, input).await?;
    Ok(Json(MovedResponse {
        message: format!("{moved_count} words moved"),
        moved_count,
    }))
}

/// GET /api/wordbooks/:id/export
pub async fn export_wordbook(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let export = service(&state).export_csv(&user.uid, &id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let disposition = content_disposition(&export.filename);
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|e| AppError::Internal(e.into()))?,
    );

    Ok((StatusCode::OK, headers, export.body).into_response())
}

/// `attachment` with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"export.csv\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

/// POST /api/wordbooks/:id/import
pub async fn import_words(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<ImportedResponse>, AppError> {
    let rows: Vec<ImportedWord> = json_array(body, "words")?;
    let imported_count = service(&state).import(&user.uid, &id, rows).await?;
    Ok(Json(ImportedResponse {
        message: format!("{imported_count} words imported"),
        imported_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_encodes_unicode_names() {
        assert_eq!(
            content_disposition("토익 1.csv"),
            "attachment; filename=\"export.csv\"; filename*=UTF-8''%ED%86%A0%EC%9D%B5%201.csv"
        );
    }
}
