//! Discussion service
//!
//! Community forum posts and their comments.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{author_for, require_text};
use crate::auth::VerifiedIdentity;
use crate::data::{Comment, Database, Discussion, DiscussionSort, EntityId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct DiscussionInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub content: Option<String>,
}

/// A post together with its comments, oldest comment first
#[derive(Debug, Serialize)]
pub struct DiscussionWithComments {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub comments: Vec<Comment>,
}

/// Discussion service
pub struct DiscussionService {
    db: Arc<Database>,
}

impl DiscussionService {
    /// Create new discussion service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List posts; `category` of `None` or "all" lists every category
    pub async fn list(
        &self,
        category: Option<&str>,
        sort: DiscussionSort,
    ) -> Result<Vec<Discussion>, AppError> {
        let category = category.filter(|c| !c.is_empty() && *c != "all");
        self.db.list_discussions(category, sort).await
    }

    pub async fn create(
        &self,
        identity: &VerifiedIdentity,
        input: DiscussionInput,
    ) -> Result<Discussion, AppError> {
        let (title, content, category) = validate_post(input)?;
        let author = author_for(&self.db, identity).await?;
        let now = Utc::now();

        let discussion = Discussion {
            id: EntityId::new().0,
            title,
            content,
            category,
            author,
            likes: 0,
            liked_by: Vec::new(),
            comment_count: 0,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_discussion(&discussion).await?;

        tracing::info!(discussion_id = %discussion.id, author = %identity.uid, "Discussion created");
        Ok(discussion)
    }

    /// Read a post, counting one view
    pub async fn view(&self, id: &str) -> Result<DiscussionWithComments, AppError> {
        if !self.db.increment_discussion_views(id).await? {
            return Err(AppError::NotFound);
        }
        let discussion = self.db.get_discussion(id).await?.ok_or(AppError::NotFound)?;
        let comments = self.db.list_comments(id, false).await?;
        Ok(DiscussionWithComments {
            discussion,
            comments,
        })
    }

    async fn authored(&self, user_id: &str, id: &str) -> Result<Discussion, AppError> {
        let discussion = self.db.get_discussion(id).await?.ok_or(AppError::NotFound)?;
        if discussion.author.uid != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(discussion)
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        input: DiscussionInput,
    ) -> Result<Discussion, AppError> {
        let (title, content, category) = validate_post(input)?;
        self.authored(user_id, id).await?;

        self.db
            .update_discussion(id, &title, &content, &category, Utc::now())
            .await?;
        self.db.get_discussion(id).await?.ok_or(AppError::NotFound)
    }

    /// Delete a post and all of its comments
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), AppError> {
        self.authored(user_id, id).await?;
        if !self.db.delete_discussion(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(discussion_id = %id, "Discussion deleted");
        Ok(())
    }

    /// Toggle the caller's like; returns the new count and the likers
    pub async fn toggle_like(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<(i64, Vec<String>), AppError> {
        self.db
            .toggle_discussion_like(id, user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Comments of a post, newest first
    pub async fn comments(&self, discussion_id: &str) -> Result<Vec<Comment>, AppError> {
        if self.db.get_discussion(discussion_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        self.db.list_comments(discussion_id, true).await
    }

    pub async fn add_comment(
        &self,
        identity: &VerifiedIdentity,
        discussion_id: &str,
        input: CommentInput,
    ) -> Result<Comment, AppError> {
        let content = require_text(input.content, "content")?;
        let author = author_for(&self.db, identity).await?;
        let now = Utc::now();

        let comment = Comment {
            id: EntityId::new().0,
            discussion_id: discussion_id.to_string(),
            content,
            author,
            created_at: now,
            updated_at: now,
        };
        if !self.db.insert_comment(&comment).await? {
            return Err(AppError::NotFound);
        }
        Ok(comment)
    }

    async fn authored_comment(
        &self,
        user_id: &str,
        discussion_id: &str,
        comment_id: &str,
    ) -> Result<Comment, AppError> {
        let comment = self
            .db
            .get_comment(discussion_id, comment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if comment.author.uid != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        user_id: &str,
        discussion_id: &str,
        comment_id: &str,
        input: CommentInput,
    ) -> Result<Comment, AppError> {
        let content = require_text(input.content, "content")?;
        let mut comment = self
            .authored_comment(user_id, discussion_id, comment_id)
            .await?;

        let now = Utc::now();
        self.db
            .update_comment(discussion_id, comment_id, &content, now)
            .await?;
        comment.content = content;
        comment.updated_at = now;
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        user_id: &str,
        discussion_id: &str,
        comment_id: &str,
    ) -> Result<(), AppError> {
        self.authored_comment(user_id, discussion_id, comment_id)
            .await?;
        if !self.db.delete_comment(discussion_id, comment_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

fn validate_post(input: DiscussionInput) -> Result<(String, String, String), AppError> {
    Ok((
        require_text(input.title, "title")?,
        require_text(input.content, "content")?,
        require_text(input.category, "category")?,
    ))
}
