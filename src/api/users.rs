//! User profile endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

use super::ApiJson;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{OwnProfile, ProfileService, ProfileUpdate, PublicProfile};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/user/profile
pub async fn get_own_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<OwnProfile>, AppError> {
    Ok(Json(ProfileService::new(state.db.clone()).own(&user).await?))
}

/// PUT /api/user/profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<MessageResponse>, AppError> {
    ProfileService::new(state.db.clone())
        .update(&user.uid, update)
        .await?;
    Ok(Json(MessageResponse {
        message: "Profile updated".to_string(),
    }))
}

/// GET /api/user/:user_id/profile
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfile>, AppError> {
    Ok(Json(
        ProfileService::new(state.db.clone()).public(&user_id).await?,
    ))
}
