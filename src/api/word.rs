//! Word lookup endpoint

use axum::{extract::State, response::Json};

use super::{ApiJson, json_array};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Word;
use crate::error::AppError;
use crate::service::{WordRef, WordbookService};

/// POST /api/word
///
/// Body: `[{wordbookId, wordId}, ...]`. Words that do not exist or live in
/// someone else's wordbook are left out.
pub async fn lookup_words(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<Vec<Word>>, AppError> {
    let refs: Vec<WordRef> = json_array(body, "word references")?;
    let words = WordbookService::new(state.db.clone())
        .lookup(&user.uid, &refs)
        .await?;
    Ok(Json(words))
}
