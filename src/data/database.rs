//! SQLite database operations
//!
//! All database access goes through this module.
//! Multi-row writes (counters, likes, moves, imports) run inside a
//! single transaction so stored counts never drift from the rows they count.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Ordering of the discussion list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscussionSort {
    /// Newest first
    #[default]
    CreatedAt,
    /// Most liked first, newest first among ties
    Likes,
    /// Posts with at least `HOT_LIKES_THRESHOLD` likes, most liked first
    Hot,
}

impl DiscussionSort {
    /// Parse the `sortBy` query value; unknown values fall back to newest first
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("likes") => Self::Likes,
            Some("hot") => Self::Hot,
            _ => Self::CreatedAt,
        }
    }
}

/// Minimum likes for a discussion to be listed as hot
pub const HOT_LIKES_THRESHOLD: i64 = 3;

/// Tables holding per-user like markers
#[derive(Debug, Clone, Copy)]
enum LikeTable {
    Discussions,
    CommunityWordbooks,
}

impl LikeTable {
    fn table_and_column(self) -> (&'static str, &'static str) {
        match self {
            Self::Discussions => ("discussion_likes", "discussion_id"),
            Self::CommunityWordbooks => ("community_wordbook_likes", "community_wordbook_id"),
        }
    }
}

/// Recompute `word_count`, `mastered_count` and `progress` from the stored words
async fn refresh_wordbook_counts(
    conn: &mut SqliteConnection,
    wordbook_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let (total, mastered): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(mastered), 0) FROM words WHERE wordbook_id = ?",
    )
    .bind(wordbook_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE wordbooks SET word_count = ?, mastered_count = ?, progress = ?, updated_at = ? WHERE id = ?",
    )
    .bind(total)
    .bind(mastered)
    .bind(progress_percent(mastered, total))
    .bind(now)
    .bind(wordbook_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_word_row(conn: &mut SqliteConnection, word: &Word) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO words (
            wordbook_id, id, word, meaning, example, pronunciation, part_of_speech, text,
            mastered, study_count, correct_count, incorrect_count, last_studied,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&word.wordbook_id)
    .bind(&word.id)
    .bind(&word.word)
    .bind(&word.meaning)
    .bind(&word.example)
    .bind(&word.pronunciation)
    .bind(&word.part_of_speech)
    .bind(&word.text)
    .bind(word.mastered)
    .bind(word.study_count)
    .bind(word.correct_count)
    .bind(word.incorrect_count)
    .bind(word.last_studied)
    .bind(word.created_at)
    .bind(word.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_wordbook_row(
    conn: &mut SqliteConnection,
    wordbook: &Wordbook,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO wordbooks (
            id, user_id, user_name, name, description, category, word_count,
            mastered_count, progress, source, created_at, updated_at, last_studied
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&wordbook.id)
    .bind(&wordbook.user_id)
    .bind(&wordbook.user_name)
    .bind(&wordbook.name)
    .bind(&wordbook.description)
    .bind(&wordbook.category)
    .bind(wordbook.word_count)
    .bind(wordbook.mastered_count)
    .bind(wordbook.progress)
    .bind(&wordbook.source)
    .bind(wordbook.created_at)
    .bind(wordbook.updated_at)
    .bind(wordbook.last_studied)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
            }
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Check that the database answers
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert the user row on first sight; existing rows are left untouched
    pub async fn ensure_user(
        &self,
        uid: &str,
        email: Option<&str>,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (uid, email, display_name, photo_url, bio, created_at, updated_at)
            VALUES (?, ?, ?, ?, '', ?, ?)
            ON CONFLICT(uid) DO NOTHING
            "#,
        )
        .bind(uid)
        .bind(email)
        .bind(display_name)
        .bind(photo_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Merge profile fields
    ///
    /// A new name also becomes the display name and is written to the
    /// author stamp of everything the user has published.
    pub async fn update_profile(
        &self,
        uid: &str,
        name: Option<&str>,
        username: Option<&str>,
        bio: Option<&str>,
    ) -> Result<bool, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE(?, name),
                display_name = COALESCE(?, display_name),
                username = COALESCE(?, username),
                bio = COALESCE(?, bio),
                updated_at = ?
            WHERE uid = ?
            "#,
        )
        .bind(name)
        .bind(name)
        .bind(username)
        .bind(bio)
        .bind(now)
        .bind(uid)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(name) = name {
            for statement in [
                "UPDATE discussions SET author_name = ? WHERE author_uid = ?",
                "UPDATE comments SET author_name = ? WHERE author_uid = ?",
                "UPDATE community_wordbooks SET author_name = ? WHERE author_uid = ?",
                "UPDATE wordbooks SET user_name = ? WHERE user_id = ?",
            ] {
                sqlx::query(statement)
                    .bind(name)
                    .bind(uid)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    // =========================================================================
    // Wordbooks
    // =========================================================================

    /// Wordbooks owned by a user, most recently studied first
    pub async fn list_wordbooks(&self, user_id: &str) -> Result<Vec<Wordbook>, AppError> {
        let wordbooks = sqlx::query_as::<_, Wordbook>(
            "SELECT * FROM wordbooks WHERE user_id = ? ORDER BY last_studied DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(wordbooks)
    }

    pub async fn get_wordbook(&self, id: &str) -> Result<Option<Wordbook>, AppError> {
        let wordbook = sqlx::query_as::<_, Wordbook>("SELECT * FROM wordbooks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(wordbook)
    }

    pub async fn insert_wordbook(&self, wordbook: &Wordbook) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_wordbook_row(&mut conn, wordbook).await
    }

    /// Partial metadata update; also marks the wordbook as studied now
    pub async fn update_wordbook(
        &self,
        id: &str,
        name: Option<&str>,
        category: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Wordbook>, AppError> {
        let wordbook = sqlx::query_as::<_, Wordbook>(
            r#"
            UPDATE wordbooks SET
                name = COALESCE(?, name),
                category = COALESCE(?, category),
                description = COALESCE(?, description),
                updated_at = ?,
                last_studied = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(category)
        .bind(description)
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(wordbook)
    }

    pub async fn touch_wordbook(&self, id: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE wordbooks SET last_studied = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a wordbook; its words and study sessions go with it
    pub async fn delete_wordbook(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM wordbooks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Words
    // =========================================================================

    /// Words of a wordbook, newest first
    pub async fn list_words(&self, wordbook_id: &str) -> Result<Vec<Word>, AppError> {
        let words = sqlx::query_as::<_, Word>(
            "SELECT * FROM words WHERE wordbook_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(wordbook_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(words)
    }

    pub async fn get_word(&self, wordbook_id: &str, id: &str) -> Result<Option<Word>, AppError> {
        let word = sqlx::query_as::<_, Word>("SELECT * FROM words WHERE wordbook_id = ? AND id = ?")
            .bind(wordbook_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(word)
    }

    /// Words of one wordbook by id, in the order the ids were given.
    /// Unknown ids are skipped.
    pub async fn get_words_by_ids(
        &self,
        wordbook_id: &str,
        ids: &[String],
    ) -> Result<Vec<Word>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM words WHERE wordbook_id = ");
        builder.push_bind(wordbook_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<Word>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_id: HashMap<String, Word> =
            rows.into_iter().map(|word| (word.id.clone(), word)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// A word, only if its wordbook belongs to `user_id`
    pub async fn find_owned_word(
        &self,
        user_id: &str,
        wordbook_id: &str,
        word_id: &str,
    ) -> Result<Option<Word>, AppError> {
        let word = sqlx::query_as::<_, Word>(
            r#"
            SELECT w.* FROM words w
            JOIN wordbooks b ON b.id = w.wordbook_id
            WHERE w.wordbook_id = ? AND w.id = ? AND b.user_id = ?
            "#,
        )
        .bind(wordbook_id)
        .bind(word_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(word)
    }

    /// Insert one word and refresh the wordbook counters
    pub async fn add_word(&self, word: &Word) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        insert_word_row(&mut tx, word).await?;
        refresh_wordbook_counts(&mut tx, &word.wordbook_id, word.updated_at).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert many words atomically and refresh the wordbook counters
    pub async fn add_words(&self, wordbook_id: &str, words: &[Word]) -> Result<(), AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for word in words {
            insert_word_row(&mut tx, word).await?;
        }
        refresh_wordbook_counts(&mut tx, wordbook_id, now).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Persist an edited word and refresh the wordbook counters
    pub async fn save_word(&self, word: &Word) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE words SET
                word = ?, meaning = ?, example = ?, pronunciation = ?, part_of_speech = ?,
                text = ?, mastered = ?, study_count = ?, correct_count = ?,
                incorrect_count = ?, last_studied = ?, updated_at = ?
            WHERE wordbook_id = ? AND id = ?
            "#,
        )
        .bind(&word.word)
        .bind(&word.meaning)
        .bind(&word.example)
        .bind(&word.pronunciation)
        .bind(&word.part_of_speech)
        .bind(&word.text)
        .bind(word.mastered)
        .bind(word.study_count)
        .bind(word.correct_count)
        .bind(word.incorrect_count)
        .bind(word.last_studied)
        .bind(word.updated_at)
        .bind(&word.wordbook_id)
        .bind(&word.id)
        .execute(&mut *tx)
        .await?;
        refresh_wordbook_counts(&mut tx, &word.wordbook_id, word.updated_at).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_word(&self, wordbook_id: &str, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM words WHERE wordbook_id = ? AND id = ?")
            .bind(wordbook_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        refresh_wordbook_counts(&mut tx, wordbook_id, Utc::now()).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Move words between wordbooks keeping their ids
    ///
    /// Ids missing from the source are skipped. Returns the number moved.
    pub async fn move_words(
        &self,
        source_id: &str,
        destination_id: &str,
        word_ids: &[String],
    ) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut moved = 0usize;

        for word_id in word_ids {
            let result = sqlx::query(
                "UPDATE OR REPLACE words SET wordbook_id = ?, updated_at = ? WHERE wordbook_id = ? AND id = ?",
            )
            .bind(destination_id)
            .bind(now)
            .bind(source_id)
            .bind(word_id)
            .execute(&mut *tx)
            .await?;
            moved += result.rows_affected() as usize;
        }

        refresh_wordbook_counts(&mut tx, source_id, now).await?;
        refresh_wordbook_counts(&mut tx, destination_id, now).await?;
        tx.commit().await?;
        Ok(moved)
    }

    // =========================================================================
    // Study Sessions
    // =========================================================================

    pub async fn insert_study_session(&self, session: &StudySession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO study_sessions (
                id, user_id, wordbook_id, wordbook_name, mode, score, duration,
                correct_words, incorrect_words, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.wordbook_id)
        .bind(&session.wordbook_name)
        .bind(&session.mode)
        .bind(session.score)
        .bind(session.duration)
        .bind(&session.correct_words)
        .bind(&session.incorrect_words)
        .bind(session.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sessions of a user, newest first
    pub async fn list_study_sessions(&self, user_id: &str) -> Result<Vec<StudySession>, AppError> {
        let sessions = sqlx::query_as::<_, StudySession>(
            "SELECT * FROM study_sessions WHERE user_id = ? ORDER BY completed_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn get_study_session(&self, id: &str) -> Result<Option<StudySession>, AppError> {
        let session =
            sqlx::query_as::<_, StudySession>("SELECT * FROM study_sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(session)
    }

    /// Sessions completed in `[from, to)`, newest first
    pub async fn list_study_sessions_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, AppError> {
        let sessions = sqlx::query_as::<_, StudySession>(
            r#"
            SELECT * FROM study_sessions
            WHERE user_id = ? AND completed_at >= ? AND completed_at < ?
            ORDER BY completed_at DESC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Completion times of all sessions since `since`, newest first
    pub async fn list_study_times_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, AppError> {
        let times = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT completed_at FROM study_sessions
            WHERE user_id = ? AND completed_at >= ?
            ORDER BY completed_at DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(times)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    async fn likers_for(
        &self,
        table: LikeTable,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, AppError> {
        let mut likers: HashMap<String, Vec<String>> = HashMap::new();
        if ids.is_empty() {
            return Ok(likers);
        }

        let (table_name, column) = table.table_and_column();
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {column}, user_id FROM {table_name} WHERE {column} IN ("
        ));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY created_at, user_id");

        let rows = builder
            .build_query_as::<(String, String)>()
            .fetch_all(&self.pool)
            .await?;
        for (subject_id, user_id) in rows {
            likers.entry(subject_id).or_default().push(user_id);
        }
        Ok(likers)
    }

    /// Flip the caller's like inside one transaction
    ///
    /// Returns `None` when the subject does not exist, otherwise the new
    /// like count, whether the caller now likes it, and the likers.
    async fn toggle_like(
        &self,
        table: LikeTable,
        subject_id: &str,
        user_id: &str,
    ) -> Result<Option<(i64, bool, Vec<String>)>, AppError> {
        let (like_table, column) = table.table_and_column();
        let subject_table = match table {
            LikeTable::Discussions => "discussions",
            LikeTable::CommunityWordbooks => "community_wordbooks",
        };

        // The first statement must write: SQLite cannot upgrade a read
        // transaction once another connection has committed.
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO {like_table} ({column}, user_id, created_at)
            SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM {subject_table} WHERE id = ?)
            ON CONFLICT DO NOTHING
            "#
        ))
        .bind(subject_id)
        .bind(user_id)
        .bind(Utc::now())
        .bind(subject_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query(&format!(
                "UPDATE {subject_table} SET likes = likes + 1 WHERE id = ?"
            ))
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        } else {
            let removed = sqlx::query(&format!(
                "DELETE FROM {like_table} WHERE {column} = ? AND user_id = ?"
            ))
            .bind(subject_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                > 0;
            if !removed {
                // Nothing inserted and nothing to remove: the subject is gone
                return Ok(None);
            }
            sqlx::query(&format!(
                "UPDATE {subject_table} SET likes = MAX(likes - 1, 0) WHERE id = ?"
            ))
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        }

        let likes = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT likes FROM {subject_table} WHERE id = ?"
        ))
        .bind(subject_id)
        .fetch_one(&mut *tx)
        .await?;

        let liked_by = sqlx::query_scalar::<_, String>(&format!(
            "SELECT user_id FROM {like_table} WHERE {column} = ? ORDER BY created_at, user_id"
        ))
        .bind(subject_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some((likes, inserted, liked_by)))
    }

    // =========================================================================
    // Discussions
    // =========================================================================

    pub async fn list_discussions(
        &self,
        category: Option<&str>,
        sort: DiscussionSort,
    ) -> Result<Vec<Discussion>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM discussions WHERE 1 = 1");
        if let Some(category) = category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }
        match sort {
            DiscussionSort::CreatedAt => {
                builder.push(" ORDER BY created_at DESC, id DESC");
            }
            DiscussionSort::Likes => {
                builder.push(" ORDER BY likes DESC, created_at DESC");
            }
            DiscussionSort::Hot => {
                builder.push(" AND likes >= ");
                builder.push_bind(HOT_LIKES_THRESHOLD);
                builder.push(" ORDER BY likes DESC, created_at DESC");
            }
        }

        let discussions = builder
            .build_query_as::<Discussion>()
            .fetch_all(&self.pool)
            .await?;
        self.with_discussion_likers(discussions).await
    }

    /// Discussions written by a user, newest first
    pub async fn list_discussions_by_author(
        &self,
        author_uid: &str,
    ) -> Result<Vec<Discussion>, AppError> {
        let discussions = sqlx::query_as::<_, Discussion>(
            "SELECT * FROM discussions WHERE author_uid = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(author_uid)
        .fetch_all(&self.pool)
        .await?;
        self.with_discussion_likers(discussions).await
    }

    async fn with_discussion_likers(
        &self,
        mut discussions: Vec<Discussion>,
    ) -> Result<Vec<Discussion>, AppError> {
        let ids: Vec<String> = discussions.iter().map(|d| d.id.clone()).collect();
        let mut likers = self.likers_for(LikeTable::Discussions, &ids).await?;
        for discussion in &mut discussions {
            discussion.liked_by = likers.remove(&discussion.id).unwrap_or_default();
        }
        Ok(discussions)
    }

    pub async fn get_discussion(&self, id: &str) -> Result<Option<Discussion>, AppError> {
        let discussion =
            sqlx::query_as::<_, Discussion>("SELECT * FROM discussions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match discussion {
            Some(discussion) => Ok(self
                .with_discussion_likers(vec![discussion])
                .await?
                .pop()),
            None => Ok(None),
        }
    }

    pub async fn insert_discussion(&self, discussion: &Discussion) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO discussions (
                id, title, content, category, author_uid, author_name, author_photo_url,
                likes, comment_count, views, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&discussion.id)
        .bind(&discussion.title)
        .bind(&discussion.content)
        .bind(&discussion.category)
        .bind(&discussion.author.uid)
        .bind(&discussion.author.name)
        .bind(&discussion.author.photo_url)
        .bind(discussion.likes)
        .bind(discussion.comment_count)
        .bind(discussion.views)
        .bind(discussion.created_at)
        .bind(discussion.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Count one view; returns false when the post does not exist
    pub async fn increment_discussion_views(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE discussions SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_discussion(
        &self,
        id: &str,
        title: &str,
        content: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE discussions SET title = ?, content = ?, category = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(category)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a post; its comments and likes go with it
    pub async fn delete_discussion(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM discussions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Toggle the caller's like; `None` when the post does not exist
    pub async fn toggle_discussion_like(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<(i64, Vec<String>)>, AppError> {
        Ok(self
            .toggle_like(LikeTable::Discussions, id, user_id)
            .await?
            .map(|(likes, _, liked_by)| (likes, liked_by)))
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn list_comments(
        &self,
        discussion_id: &str,
        newest_first: bool,
    ) -> Result<Vec<Comment>, AppError> {
        let sql = if newest_first {
            "SELECT * FROM comments WHERE discussion_id = ? ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT * FROM comments WHERE discussion_id = ? ORDER BY created_at ASC, id ASC"
        };
        let comments = sqlx::query_as::<_, Comment>(sql)
            .bind(discussion_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    pub async fn get_comment(
        &self,
        discussion_id: &str,
        id: &str,
    ) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE discussion_id = ? AND id = ?",
        )
        .bind(discussion_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    /// Insert a comment and bump the post's counter in one transaction.
    /// Returns false when the post does not exist.
    pub async fn insert_comment(&self, comment: &Comment) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE discussions SET comment_count = comment_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(comment.created_at)
        .bind(&comment.discussion_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO comments (
                id, discussion_id, content, author_uid, author_name, author_photo_url,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.discussion_id)
        .bind(&comment.content)
        .bind(&comment.author.uid)
        .bind(&comment.author.name)
        .bind(&comment.author.photo_url)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn update_comment(
        &self,
        discussion_id: &str,
        id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE comments SET content = ?, updated_at = ? WHERE discussion_id = ? AND id = ?",
        )
        .bind(content)
        .bind(now)
        .bind(discussion_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a comment and decrement the post's counter in one transaction
    pub async fn delete_comment(&self, discussion_id: &str, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM comments WHERE discussion_id = ? AND id = ?")
            .bind(discussion_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE discussions SET comment_count = MAX(comment_count - 1, 0) WHERE id = ?",
        )
        .bind(discussion_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    // =========================================================================
    // Community Wordbooks
    // =========================================================================

    async fn with_wordbook_likers(
        &self,
        mut wordbooks: Vec<CommunityWordbook>,
    ) -> Result<Vec<CommunityWordbook>, AppError> {
        let ids: Vec<String> = wordbooks.iter().map(|w| w.id.clone()).collect();
        let mut likers = self.likers_for(LikeTable::CommunityWordbooks, &ids).await?;
        for wordbook in &mut wordbooks {
            wordbook.liked_by = likers.remove(&wordbook.id).unwrap_or_default();
        }
        Ok(wordbooks)
    }

    /// Shared wordbooks, newest first
    pub async fn list_community_wordbooks(&self) -> Result<Vec<CommunityWordbook>, AppError> {
        let wordbooks = sqlx::query_as::<_, CommunityWordbook>(
            "SELECT * FROM community_wordbooks ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        self.with_wordbook_likers(wordbooks).await
    }

    pub async fn list_community_wordbooks_by_author(
        &self,
        author_uid: &str,
    ) -> Result<Vec<CommunityWordbook>, AppError> {
        let wordbooks = sqlx::query_as::<_, CommunityWordbook>(
            "SELECT * FROM community_wordbooks WHERE author_uid = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(author_uid)
        .fetch_all(&self.pool)
        .await?;
        self.with_wordbook_likers(wordbooks).await
    }

    pub async fn get_community_wordbook(
        &self,
        id: &str,
    ) -> Result<Option<CommunityWordbook>, AppError> {
        let wordbook = sqlx::query_as::<_, CommunityWordbook>(
            "SELECT * FROM community_wordbooks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match wordbook {
            Some(wordbook) => Ok(self.with_wordbook_likers(vec![wordbook]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn insert_community_wordbook(
        &self,
        wordbook: &CommunityWordbook,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO community_wordbooks (
                id, original_wordbook_id, name, description, category, word_count, words,
                author_uid, author_name, author_photo_url, likes, downloads, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&wordbook.id)
        .bind(&wordbook.original_wordbook_id)
        .bind(&wordbook.name)
        .bind(&wordbook.description)
        .bind(&wordbook.category)
        .bind(wordbook.word_count)
        .bind(&wordbook.words)
        .bind(&wordbook.author.uid)
        .bind(&wordbook.author.name)
        .bind(&wordbook.author.photo_url)
        .bind(wordbook.likes)
        .bind(wordbook.downloads)
        .bind(wordbook.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Toggle the caller's like; `None` when the snapshot does not exist
    pub async fn toggle_community_wordbook_like(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<(i64, bool)>, AppError> {
        Ok(self
            .toggle_like(LikeTable::CommunityWordbooks, id, user_id)
            .await?
            .map(|(likes, is_liked, _)| (likes, is_liked)))
    }

    /// Store a downloaded copy and count the download in one transaction.
    /// Returns false when the snapshot no longer exists.
    pub async fn store_download(
        &self,
        community_id: &str,
        wordbook: &Wordbook,
        words: &[Word],
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE community_wordbooks SET downloads = downloads + 1 WHERE id = ?")
                .bind(community_id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        insert_wordbook_row(&mut tx, wordbook).await?;
        for word in words {
            insert_word_row(&mut tx, word).await?;
        }
        refresh_wordbook_counts(&mut tx, &wordbook.id, wordbook.updated_at).await?;

        tx.commit().await?;
        Ok(true)
    }
}
