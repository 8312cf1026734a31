//! Community wordbook endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;

use super::ApiJson;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::CommunityWordbook;
use crate::error::AppError;
use crate::service::{CommunityService, ShareWordbook};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub new_likes: i64,
    pub is_liked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub message: String,
    pub new_wordbook_id: String,
}

fn service(state: &AppState) -> CommunityService {
    CommunityService::new(state.db.clone())
}

/// GET /api/community/wordbooks
pub async fn list_community_wordbooks(
    State(state): State<AppState>,
) -> Result<Json<Vec<CommunityWordbook>>, AppError> {
    Ok(Json(service(&state).list().await?))
}

/// GET /api/community/wordbooks/:id
pub async fn get_community_wordbook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommunityWordbook>, AppError> {
    Ok(Json(service(&state).get(&id).await?))
}

/// POST /api/community/wordbooks
pub async fn share_wordbook(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<ShareWordbook>,
) -> Result<(StatusCode, Json<CommunityWordbook>), AppError> {
    let shared = service(&state).share(&user, input).await?;
    Ok((StatusCode::CREATED, Json(shared)))
}

/// POST /api/community/wordbooks/:id/like
pub async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LikeResponse>, AppError> {
    let (new_likes, is_liked) = service(&state).toggle_like(&user.uid, &id).await?;
    Ok(Json(LikeResponse {
        new_likes,
        is_liked,
    }))
}

/// POST /api/community/wordbooks/:id/download
pub async fn download(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DownloadResponse>, AppError> {
    let new_wordbook_id = service(&state).download(&user, &id).await?;
    Ok(Json(DownloadResponse {
        message: "Wordbook downloaded".to_string(),
        new_wordbook_id,
    }))
}
