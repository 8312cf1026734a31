//! Study session and learning statistics endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::ApiJson;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::StudySession;
use crate::error::AppError;
use crate::service::{LearningStats, NewStudySession, StatsService, StudyService, StudySessionDetail};

/// GET /api/study-sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<StudySession>>, AppError> {
    let sessions = StudyService::new(state.db.clone()).list(&user.uid).await?;
    Ok(Json(sessions))
}

/// POST /api/study-sessions
pub async fn create_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<NewStudySession>,
) -> Result<(StatusCode, Json<StudySession>), AppError> {
    let session = StudyService::new(state.db.clone())
        .record(&user.uid, input)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/study-sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StudySessionDetail>, AppError> {
    let detail = StudyService::new(state.db.clone())
        .detail(&user.uid, &id)
        .await?;
    Ok(Json(detail))
}

/// GET /api/learning-stats
pub async fn learning_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<LearningStats>, AppError> {
    let stats = StatsService::new(state.db.clone(), state.config.stats.utc_offset_hours)?
        .learning_stats(&user.uid)
        .await?;
    Ok(Json(stats))
}
