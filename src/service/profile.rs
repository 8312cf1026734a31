//! Profile service
//!
//! Own profile, profile edits and public profiles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::VerifiedIdentity;
use crate::data::{CommunityWordbook, Database, Discussion, User};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnProfile {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub bio: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub uid: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub followers: i64,
    pub following: i64,
    pub shared_wordbooks: Vec<CommunityWordbook>,
    pub discussions: Vec<Discussion>,
}

/// Profile service
pub struct ProfileService {
    db: Arc<Database>,
}

impl ProfileService {
    /// Create new profile service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn user(&self, uid: &str) -> Result<User, AppError> {
        self.db.get_user(uid).await?.ok_or(AppError::NotFound)
    }

    pub async fn own(&self, identity: &VerifiedIdentity) -> Result<OwnProfile, AppError> {
        let user = self.user(&identity.uid).await?;
        let email = user.email.clone().unwrap_or_default();

        Ok(OwnProfile {
            uid: user.uid.clone(),
            name: profile_name(&user),
            username: user
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| email_local_part(&email).to_string()),
            email,
            bio: user.bio,
            photo_url: user.photo_url.unwrap_or_default(),
        })
    }

    /// Merge the given fields into the caller's profile
    pub async fn update(&self, uid: &str, update: ProfileUpdate) -> Result<(), AppError> {
        let name = update.name.filter(|n| !n.trim().is_empty());
        if !self
            .db
            .update_profile(
                uid,
                name.as_deref(),
                update.username.as_deref(),
                update.bio.as_deref(),
            )
            .await?
        {
            return Err(AppError::NotFound);
        }
        if name.is_some() {
            tracing::info!(user_id = %uid, "Profile name changed; author stamps updated");
        }
        Ok(())
    }

    /// Profile of any user with what they have published
    pub async fn public(&self, uid: &str) -> Result<PublicProfile, AppError> {
        let user = self.user(uid).await?;
        let shared_wordbooks = self.db.list_community_wordbooks_by_author(uid).await?;
        let discussions = self.db.list_discussions_by_author(uid).await?;

        Ok(PublicProfile {
            uid: user.uid.clone(),
            name: profile_name(&user),
            email: user.email.unwrap_or_default(),
            photo_url: user.photo_url.unwrap_or_default(),
            bio: user.bio,
            created_at: user.created_at,
            followers: 0,
            following: 0,
            shared_wordbooks,
            discussions,
        })
    }
}

/// Display name, else profile name, else empty
fn profile_name(user: &User) -> String {
    user.display_name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| user.name.clone())
        .unwrap_or_default()
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}
