//! Study session service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::require_text;
use crate::data::{Database, EntityId, StudySession, Word};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudySession {
    pub wordbook_id: Option<String>,
    pub wordbook_name: Option<String>,
    pub mode: Option<String>,
    pub score: Option<f64>,
    /// Seconds; zero is rejected
    pub duration: Option<i64>,
    #[serde(default)]
    pub correct_words: Vec<String>,
    #[serde(default)]
    pub incorrect_words: Vec<String>,
}

/// A session with its word ids resolved to words
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionDetail {
    pub id: String,
    pub user_id: String,
    pub wordbook_id: String,
    pub wordbook_name: String,
    pub mode: String,
    pub score: f64,
    pub duration: i64,
    pub completed_at: DateTime<Utc>,
    pub correct_words: Vec<Word>,
    pub incorrect_words: Vec<Word>,
}

/// Study session service
pub struct StudyService {
    db: Arc<Database>,
}

impl StudyService {
    /// Create new study session service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<StudySession>, AppError> {
        self.db.list_study_sessions(user_id).await
    }

    pub async fn record(
        &self,
        user_id: &str,
        input: NewStudySession,
    ) -> Result<StudySession, AppError> {
        let wordbook_id = require_text(input.wordbook_id, "wordbookId")?;
        let wordbook_name = require_text(input.wordbook_name, "wordbookName")?;
        let mode = require_text(input.mode, "mode")?;
        let score = input
            .score
            .ok_or_else(|| AppError::Validation("score is required".to_string()))?;
        let duration = input
            .duration
            .filter(|d| *d != 0)
            .ok_or_else(|| AppError::Validation("duration is required".to_string()))?;

        match self.db.get_wordbook(&wordbook_id).await? {
            Some(wordbook) if wordbook.user_id == user_id => {}
            _ => return Err(AppError::NotFound),
        }

        let session = StudySession {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            wordbook_id,
            wordbook_name,
            mode,
            score,
            duration,
            correct_words: Json(input.correct_words),
            incorrect_words: Json(input.incorrect_words),
            completed_at: Utc::now(),
        };
        self.db.insert_study_session(&session).await?;

        tracing::info!(
            session_id = %session.id,
            wordbook_id = %session.wordbook_id,
            score = session.score,
            "Study session recorded"
        );
        Ok(session)
    }

    /// A session of the caller with words resolved; deleted words are skipped
    pub async fn detail(&self, user_id: &str, id: &str) -> Result<StudySessionDetail, AppError> {
        let session = match self.db.get_study_session(id).await? {
            Some(session) if session.user_id == user_id => session,
            _ => return Err(AppError::NotFound),
        };

        let correct_words = self
            .db
            .get_words_by_ids(&session.wordbook_id, &session.correct_words.0)
            .await?;
        let incorrect_words = self
            .db
            .get_words_by_ids(&session.wordbook_id, &session.incorrect_words.0)
            .await?;

        Ok(StudySessionDetail {
            id: session.id,
            user_id: session.user_id,
            wordbook_id: session.wordbook_id,
            wordbook_name: session.wordbook_name,
            mode: session.mode,
            score: session.score,
            duration: session.duration,
            completed_at: session.completed_at,
            correct_words,
            incorrect_words,
        })
    }
}
