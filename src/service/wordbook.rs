//! Wordbook service
//!
//! Private wordbooks and their words. Every operation is scoped to the
//! caller: a wordbook owned by someone else is reported as missing.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{author_for, require_text};
use crate::auth::VerifiedIdentity;
use crate::data::{Database, EntityId, Word, WordPatch, Wordbook};
use crate::error::AppError;

const DEFAULT_CATEGORY: &str = "General";
const DEFAULT_IMPORT_PART_OF_SPEECH: &str = "n";
const CSV_HEADER: &str = "\u{FEFF}W,M,D,P\n";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWordbook {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordbookPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    pub word: Option<String>,
    pub meaning: Option<String>,
    pub example: Option<String>,
    pub pronunciation: Option<String>,
    pub part_of_speech: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveWords {
    pub source_wordbook_id: Option<String>,
    pub destination_wordbook_id: Option<String>,
    pub word_ids: Option<Vec<String>>,
}

/// One row of an imported word list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedWord {
    pub original: Option<String>,
    pub meaning: Option<String>,
    pub text: Option<String>,
    pub part_of_speech: Option<String>,
}

/// Reference to a word inside a wordbook
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRef {
    pub wordbook_id: String,
    pub word_id: String,
}

/// A wordbook with its words, newest first
#[derive(Debug, Serialize)]
pub struct WordbookDetail {
    #[serde(flatten)]
    pub wordbook: Wordbook,
    pub words: Vec<Word>,
}

/// Rendered CSV file
#[derive(Debug)]
pub struct CsvExport {
    /// Wordbook name with reserved filename characters replaced
    pub filename: String,
    pub body: Vec<u8>,
}

/// Wordbook service
pub struct WordbookService {
    db: Arc<Database>,
}

impl WordbookService {
    /// Create new wordbook service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load a wordbook owned by `user_id`
    ///
    /// # Errors
    /// `NotFound` when missing or owned by someone else
    pub async fn owned(&self, user_id: &str, wordbook_id: &str) -> Result<Wordbook, AppError> {
        match self.db.get_wordbook(wordbook_id).await? {
            Some(wordbook) if wordbook.user_id == user_id => Ok(wordbook),
            _ => Err(AppError::NotFound),
        }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Wordbook>, AppError> {
        self.db.list_wordbooks(user_id).await
    }

    pub async fn create(
        &self,
        identity: &VerifiedIdentity,
        input: NewWordbook,
    ) -> Result<Wordbook, AppError> {
        let name = require_text(input.name, "name")?;
        let author = author_for(&self.db, identity).await?;
        let now = Utc::now();

        let wordbook = Wordbook {
            id: EntityId::new().0,
            user_id: identity.uid.clone(),
            user_name: author.name,
            name,
            description: input.description.unwrap_or_default(),
            category: input
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            word_count: 0,
            mastered_count: 0,
            progress: 0,
            source: None,
            created_at: now,
            updated_at: now,
            last_studied: now,
        };
        self.db.insert_wordbook(&wordbook).await?;

        tracing::info!(wordbook_id = %wordbook.id, user_id = %identity.uid, "Wordbook created");
        Ok(wordbook)
    }

    /// Open a wordbook: marks it as studied now and returns it with its words
    pub async fn open(&self, user_id: &str, wordbook_id: &str) -> Result<WordbookDetail, AppError> {
        let mut wordbook = self.owned(user_id, wordbook_id).await?;
        let now = Utc::now();
        self.db.touch_wordbook(wordbook_id, now).await?;
        wordbook.last_studied = now;

        let words = self.db.list_words(wordbook_id).await?;
        Ok(WordbookDetail { wordbook, words })
    }

    pub async fn update(
        &self,
        user_id: &str,
        wordbook_id: &str,
        patch: WordbookPatch,
    ) -> Result<Wordbook, AppError> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("name cannot be empty".to_string()));
            }
        }
        self.owned(user_id, wordbook_id).await?;

        self.db
            .update_wordbook(
                wordbook_id,
                patch.name.as_deref(),
                patch.category.as_deref(),
                patch.description.as_deref(),
                Utc::now(),
            )
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn delete(&self, user_id: &str, wordbook_id: &str) -> Result<(), AppError> {
        self.owned(user_id, wordbook_id).await?;
        if !self.db.delete_wordbook(wordbook_id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(wordbook_id = %wordbook_id, "Wordbook deleted");
        Ok(())
    }

    // =========================================================================
    // Words
    // =========================================================================

    pub async fn add_word(
        &self,
        user_id: &str,
        wordbook_id: &str,
        input: NewWord,
    ) -> Result<Word, AppError> {
        self.owned(user_id, wordbook_id).await?;
        let word = require_text(input.word, "word")?;
        let meaning = require_text(input.meaning, "meaning")?;
        let now = Utc::now();

        let word = Word {
            id: EntityId::new().0,
            wordbook_id: wordbook_id.to_string(),
            word,
            meaning,
            example: input.example.unwrap_or_default(),
            pronunciation: input.pronunciation.unwrap_or_default(),
            part_of_speech: input.part_of_speech.unwrap_or_default(),
            text: input.text.unwrap_or_default(),
            mastered: false,
            study_count: 0,
            correct_count: 0,
            incorrect_count: 0,
            last_studied: None,
            created_at: now,
            updated_at: now,
        };
        self.db.add_word(&word).await?;
        Ok(word)
    }

    pub async fn update_word(
        &self,
        user_id: &str,
        wordbook_id: &str,
        word_id: &str,
        patch: WordPatch,
    ) -> Result<Word, AppError> {
        for (field, value) in [("word", &patch.word), ("meaning", &patch.meaning)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }

        self.owned(user_id, wordbook_id).await?;
        let mut word = self
            .db
            .get_word(wordbook_id, word_id)
            .await?
            .ok_or(AppError::NotFound)?;

        patch.apply(&mut word);
        word.updated_at = Utc::now();
        self.db.save_word(&word).await?;
        Ok(word)
    }

    pub async fn delete_word(
        &self,
        user_id: &str,
        wordbook_id: &str,
        word_id: &str,
    ) -> Result<(), AppError> {
        self.owned(user_id, wordbook_id).await?;
        if !self.db.delete_word(wordbook_id, word_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Move words between two of the caller's wordbooks, keeping their ids
    pub async fn move_words(&self, user_id: &str, input: MoveWords) -> Result<usize, AppError> {
        let invalid = || AppError::Validation("sourceWordbookId, destinationWordbookId and a non-empty wordIds array are required".to_string());

        let source_id = input
            .source_wordbook_id
            .filter(|id| !id.is_empty())
            .ok_or_else(invalid)?;
        let destination_id = input
            .destination_wordbook_id
            .filter(|id| !id.is_empty())
            .ok_or_else(invalid)?;
        let word_ids = input
            .word_ids
            .filter(|ids| !ids.is_empty())
            .ok_or_else(invalid)?;

        if source_id == destination_id {
            return Err(AppError::Validation(
                "source and destination wordbooks must differ".to_string(),
            ));
        }

        self.owned(user_id, &source_id).await?;
        self.owned(user_id, &destination_id).await?;

        let moved = self
            .db
            .move_words(&source_id, &destination_id, &word_ids)
            .await?;

        tracing::info!(
            source = %source_id,
            destination = %destination_id,
            moved,
            "Moved words between wordbooks"
        );
        Ok(moved)
    }

    /// Render the wordbook as CSV
    ///
    /// Columns: W (word), M (meaning), D (example, else text),
    /// P (pronunciation, else part of speech). Every field is quoted.
    pub async fn export_csv(&self, user_id: &str, wordbook_id: &str) -> Result<CsvExport, AppError> {
        let wordbook = self.owned(user_id, wordbook_id).await?;
        let words = self.db.list_words(wordbook_id).await?;

        let mut body = CSV_HEADER.as_bytes().to_vec();
        {
            let mut writer = csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::Always)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(&mut body);

            for word in &words {
                let description = first_non_empty(&word.example, &word.text);
                let part = first_non_empty(&word.pronunciation, &word.part_of_speech);
                writer
                    .write_record([
                        word.word.as_str(),
                        word.meaning.as_str(),
                        description,
                        part,
                    ])
                    .map_err(|e| AppError::Internal(e.into()))?;
            }
            writer.flush().map_err(|e| AppError::Internal(e.into()))?;
        }
        // Rows are newline-joined; only a header-only file ends with a newline
        if !words.is_empty() {
            body.pop();
        }

        let base = if wordbook.name.is_empty() {
            "export"
        } else {
            wordbook.name.as_str()
        };

        Ok(CsvExport {
            filename: format!("{}.csv", sanitize_filename(base)),
            body,
        })
    }

    /// Import rows `{original, meaning, text?, partOfSpeech?}` atomically
    ///
    /// Rows without original or meaning are skipped. Returns the number stored.
    pub async fn import(
        &self,
        user_id: &str,
        wordbook_id: &str,
        rows: Vec<ImportedWord>,
    ) -> Result<usize, AppError> {
        if rows.is_empty() {
            return Err(AppError::Validation("No words to import".to_string()));
        }
        self.owned(user_id, wordbook_id).await?;

        let now = Utc::now();
        let words: Vec<Word> = rows
            .into_iter()
            .filter_map(|row| {
                let original = row.original.filter(|v| !v.trim().is_empty())?;
                let meaning = row.meaning.filter(|v| !v.trim().is_empty())?;
                Some(Word {
                    id: EntityId::new().0,
                    wordbook_id: wordbook_id.to_string(),
                    text: row
                        .text
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(|| original.clone()),
                    part_of_speech: row
                        .part_of_speech
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(|| DEFAULT_IMPORT_PART_OF_SPEECH.to_string()),
                    word: original,
                    meaning,
                    example: String::new(),
                    pronunciation: String::new(),
                    mastered: false,
                    study_count: 0,
                    correct_count: 0,
                    incorrect_count: 0,
                    last_studied: None,
                    created_at: now,
                    updated_at: now,
                })
            })
            .collect();

        if words.is_empty() {
            return Err(AppError::Validation(
                "No valid rows: every entry needs original and meaning".to_string(),
            ));
        }

        self.db.add_words(wordbook_id, &words).await?;
        tracing::info!(wordbook_id = %wordbook_id, imported = words.len(), "Imported words");
        Ok(words.len())
    }

    /// Resolve word references, keeping only words from the caller's wordbooks
    pub async fn lookup(&self, user_id: &str, refs: &[WordRef]) -> Result<Vec<Word>, AppError> {
        let mut words = Vec::with_capacity(refs.len());
        for word_ref in refs {
            if let Some(word) = self
                .db
                .find_owned_word(user_id, &word_ref.wordbook_id, &word_ref.word_id)
                .await?
            {
                words.push(word);
            }
        }
        Ok(words)
    }
}

fn first_non_empty<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_reserved_filename_characters() {
        assert_eq!(sanitize_filename("a/b:c*d?\"e<f>g|h\\"), "a_b_c_d__e_f_g_h_");
        assert_eq!(sanitize_filename("토익 단어"), "토익 단어");
    }

    #[test]
    fn falls_back_to_secondary_column() {
        assert_eq!(first_non_empty("", "text"), "text");
        assert_eq!(first_non_empty("example", "text"), "example");
    }
}
