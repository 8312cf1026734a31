//! Community discussion and comment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::ApiJson;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Comment, Discussion, DiscussionSort};
use crate::error::AppError;
use crate::service::{CommentInput, DiscussionInput, DiscussionService, DiscussionWithComments};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub sort_by: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub likes: i64,
    pub liked_by: Vec<String>,
}

fn service(state: &AppState) -> DiscussionService {
    DiscussionService::new(state.db.clone())
}

/// GET /api/community/discussions
pub async fn list_discussions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Discussion>>, AppError> {
    let sort = DiscussionSort::parse(params.sort_by.as_deref());
    let discussions = service(&state)
        .list(params.category.as_deref(), sort)
        .await?;
    Ok(Json(discussions))
}

/// POST /api/community/discussions
pub async fn create_discussion(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<DiscussionInput>,
) -> Result<(StatusCode, Json<Discussion>), AppError> {
    let discussion = service(&state).create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(discussion)))
}

/// GET /api/community/discussions/:post_id
///
/// Counts a view.
pub async fn get_discussion(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<DiscussionWithComments>, AppError> {
    Ok(Json(service(&state).view(&post_id).await?))
}

/// PUT /api/community/discussions/:post_id
pub async fn update_discussion(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    ApiJson(input): ApiJson<DiscussionInput>,
) -> Result<Json<Discussion>, AppError> {
    let discussion = service(&state).update(&user.uid, &post_id, input).await?;
    Ok(Json(discussion))
}

/// DELETE /api/community/discussions/:post_id
pub async fn delete_discussion(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    service(&state).delete(&user.uid, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/community/discussions/:post_id/like
pub async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<LikeResponse>, AppError> {
    let (likes, liked_by) = service(&state).toggle_like(&user.uid, &post_id).await?;
    Ok(Json(LikeResponse { likes, liked_by }))
}

/// GET /api/community/discussions/:post_id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(service(&state).comments(&post_id).await?))
}

/// POST /api/community/discussions/:post_id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    ApiJson(input): ApiJson<CommentInput>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = service(&state).add_comment(&user, &post_id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/community/discussions/:post_id/comments/:comment_id
pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    ApiJson(input): ApiJson<CommentInput>,
) -> Result<Json<Comment>, AppError> {
    let comment = service(&state)
        .update_comment(&user.uid, &post_id, &comment_id, input)
        .await?;
    Ok(Json(comment))
}

/// DELETE /api/community/discussions/:post_id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    service(&state)
        .delete_comment(&user.uid, &post_id, &comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
