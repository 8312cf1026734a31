//! Data models
//!
//! Rust structs representing database rows. Rows that are returned to
//! clients as-is serialize in camelCase.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// User
// =============================================================================

/// A signed-in user, seeded from the first verified ID token
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    /// Display name from the identity provider (or the last profile rename)
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// Profile name set through the profile endpoint
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author stamp stored on discussions, comments and shared wordbooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    #[sqlx(rename = "author_uid")]
    pub uid: String,
    #[sqlx(rename = "author_name")]
    pub name: String,
    #[sqlx(rename = "author_photo_url")]
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

// =============================================================================
// Wordbooks & Words
// =============================================================================

/// A private collection of words
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wordbook {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Always equal to the number of stored words
    pub word_count: i64,
    pub mastered_count: i64,
    /// round(mastered / total * 100), 0 when empty
    pub progress: i64,
    /// Community wordbook this one was downloaded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_studied: DateTime<Utc>,
}

/// A vocabulary entry inside a wordbook
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: String,
    pub wordbook_id: String,
    pub word: String,
    pub meaning: String,
    pub example: String,
    pub pronunciation: String,
    pub part_of_speech: String,
    /// Sentence or source text the word was captured from
    pub text: String,
    pub mastered: bool,
    pub study_count: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub last_studied: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Study Sessions
// =============================================================================

/// One quiz attempt
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub user_id: String,
    pub wordbook_id: String,
    pub wordbook_name: String,
    pub mode: String,
    pub score: f64,
    /// Seconds
    pub duration: i64,
    pub correct_words: Json<Vec<String>>,
    pub incorrect_words: Json<Vec<String>>,
    pub completed_at: DateTime<Utc>,
}

// =============================================================================
// Discussions & Comments
// =============================================================================

/// A community forum post
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    #[sqlx(flatten)]
    pub author: Author,
    pub likes: i64,
    /// Filled from `discussion_likes` after loading
    #[sqlx(skip)]
    pub liked_by: Vec<String>,
    pub comment_count: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub discussion_id: String,
    pub content: String,
    #[sqlx(flatten)]
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Community Wordbooks
// =============================================================================

/// Word entry inside a shared snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedWord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub pronunciation: String,
    #[serde(default)]
    pub part_of_speech: String,
    #[serde(default)]
    pub text: String,
}

impl From<&Word> for SharedWord {
    fn from(word: &Word) -> Self {
        Self {
            id: Some(word.id.clone()),
            word: word.word.clone(),
            meaning: word.meaning.clone(),
            example: word.example.clone(),
            pronunciation: word.pronunciation.clone(),
            part_of_speech: word.part_of_speech.clone(),
            text: word.text.clone(),
        }
    }
}

/// A published wordbook snapshot
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommunityWordbook {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_wordbook_id: Option<String>,
    pub name: String,
    pub description: String,
    pub category: String,
    pub word_count: i64,
    pub words: Json<Vec<SharedWord>>,
    #[sqlx(flatten)]
    pub author: Author,
    pub likes: i64,
    /// Filled from `community_wordbook_likes` after loading
    #[sqlx(skip)]
    pub liked_by: Vec<String>,
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Partial word update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPatch {
    pub word: Option<String>,
    pub meaning: Option<String>,
    pub example: Option<String>,
    pub pronunciation: Option<String>,
    pub part_of_speech: Option<String>,
    pub text: Option<String>,
    pub mastered: Option<bool>,
    pub study_count: Option<i64>,
    pub correct_count: Option<i64>,
    pub incorrect_count: Option<i64>,
    pub last_studied: Option<DateTime<Utc>>,
}

impl WordPatch {
    /// Apply onto a loaded word
    pub fn apply(self, word: &mut Word) {
        if let Some(value) = self.word {
            word.word = value;
        }
        if let Some(value) = self.meaning {
            word.meaning = value;
        }
        if let Some(value) = self.example {
            word.example = value;
        }
        if let Some(value) = self.pronunciation {
            word.pronunciation = value;
        }
        if let Some(value) = self.part_of_speech {
            word.part_of_speech = value;
        }
        if let Some(value) = self.text {
            word.text = value;
        }
        if let Some(value) = self.mastered {
            word.mastered = value;
        }
        if let Some(value) = self.study_count {
            word.study_count = value;
        }
        if let Some(value) = self.correct_count {
            word.correct_count = value;
        }
        if let Some(value) = self.incorrect_count {
            word.incorrect_count = value;
        }
        if let Some(value) = self.last_studied {
            word.last_studied = Some(value);
        }
    }
}

/// Progress as a rounded percentage of mastered words
pub fn progress_percent(mastered: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((mastered as f64 / total as f64) * 100.0).round() as i64
}
