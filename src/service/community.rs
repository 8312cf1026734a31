//! Community wordbook service
//!
//! Shared wordbooks are immutable snapshots. Downloading one copies it into
//! a fresh private wordbook owned by the caller.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json;

use super::{author_for, require_text};
use crate::auth::VerifiedIdentity;
use crate::data::{CommunityWordbook, Database, EntityId, SharedWord, Word, Wordbook};
use crate::error::AppError;

/// Request to publish a snapshot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareWordbook {
    pub wordbook_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Words to publish; taken from `wordbook_id` when absent
    pub words: Option<Vec<SharedWord>>,
}

/// Community wordbook service
pub struct CommunityService {
    db: Arc<Database>,
}

impl CommunityService {
    /// Create new community service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<CommunityWordbook>, AppError> {
        self.db.list_community_wordbooks().await
    }

    pub async fn get(&self, id: &str) -> Result<CommunityWordbook, AppError> {
        self.db
            .get_community_wordbook(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Publish a snapshot
    ///
    /// When no words are given and `wordbook_id` names one of the caller's
    /// wordbooks, that wordbook's words are copied into the snapshot.
    pub async fn share(
        &self,
        identity: &VerifiedIdentity,
        input: ShareWordbook,
    ) -> Result<CommunityWordbook, AppError> {
        let name = require_text(input.name, "name")?;

        let words = match input.words {
            Some(words) => words,
            None => match input.wordbook_id.as_deref() {
                Some(wordbook_id) => self.snapshot_words(&identity.uid, wordbook_id).await?,
                None => Vec::new(),
            },
        };

        let author = author_for(&self.db, identity).await?;
        let shared = CommunityWordbook {
            id: EntityId::new().0,
            original_wordbook_id: input.wordbook_id,
            name,
            description: input.description.unwrap_or_default(),
            category: input.category.unwrap_or_default(),
            word_count: words.len() as i64,
            words: Json(words),
            author,
            likes: 0,
            liked_by: Vec::new(),
            downloads: 0,
            created_at: Utc::now(),
        };
        self.db.insert_community_wordbook(&shared).await?;

        tracing::info!(
            community_wordbook_id = %shared.id,
            author = %identity.uid,
            word_count = shared.word_count,
            "Wordbook shared"
        );
        Ok(shared)
    }

    async fn snapshot_words(
        &self,
        user_id: &str,
        wordbook_id: &str,
    ) -> Result<Vec<SharedWord>, AppError> {
        match self.db.get_wordbook(wordbook_id).await? {
            Some(wordbook) if wordbook.user_id == user_id => {
                let words = self.db.list_words(wordbook_id).await?;
                Ok(words.iter().map(SharedWord::from).collect())
            }
            _ => Err(AppError::NotFound),
        }
    }

    /// Toggle the caller's like; returns the new count and whether it is liked
    pub async fn toggle_like(&self, user_id: &str, id: &str) -> Result<(i64, bool), AppError> {
        self.db
            .toggle_community_wordbook_like(id, user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Copy a snapshot into a new wordbook owned by the caller
    ///
    /// Returns the new wordbook's id.
    pub async fn download(&self, identity: &VerifiedIdentity, id: &str) -> Result<String, AppError> {
        let shared = self.get(id).await?;
        let owner = author_for(&self.db, identity).await?;
        let now = Utc::now();

        let wordbook = Wordbook {
            id: EntityId::new().0,
            user_id: identity.uid.clone(),
            user_name: owner.name,
            name: shared.name.clone(),
            description: shared.description.clone(),
            category: shared.category.clone(),
            word_count: 0,
            mastered_count: 0,
            progress: 0,
            source: Some(shared.id.clone()),
            created_at: now,
            updated_at: now,
            last_studied: now,
        };

        let words = copy_words(&wordbook.id, shared.words.0, now);
        if !self.db.store_download(id, &wordbook, &words).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(
            community_wordbook_id = %id,
            wordbook_id = %wordbook.id,
            user_id = %identity.uid,
            "Community wordbook downloaded"
        );
        Ok(wordbook.id)
    }
}

/// Fresh, un-mastered words for a downloaded copy.
/// Snapshot ids are kept; missing or repeated ids get a new one.
fn copy_words(
    wordbook_id: &str,
    shared: Vec<SharedWord>,
    now: chrono::DateTime<Utc>,
) -> Vec<Word> {
    let mut seen = HashSet::new();
    shared
        .into_iter()
        .map(|word| {
            let id = word
                .id
                .filter(|id| !id.is_empty() && seen.insert(id.clone()))
                .unwrap_or_else(|| EntityId::new().0);
            Word {
                id,
                wordbook_id: wordbook_id.to_string(),
                word: word.word,
                meaning: word.meaning,
                example: word.example,
                pronunciation: word.pronunciation,
                part_of_speech: word.part_of_speech,
                text: word.text,
                mastered: false,
                study_count: 0,
                correct_count: 0,
                incorrect_count: 0,
                last_studied: None,
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}
