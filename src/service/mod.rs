//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database reads/writes and ownership checks.

mod community;
mod discussion;
mod profile;
mod stats;
mod study;
mod wordbook;

pub use community::{CommunityService, ShareWordbook};
pub use discussion::{CommentInput, DiscussionInput, DiscussionService, DiscussionWithComments};
pub use profile::{OwnProfile, ProfileService, ProfileUpdate, PublicProfile};
pub use stats::{DailyStats, LearningStats, StatsService};
pub use study::{NewStudySession, StudyService, StudySessionDetail};
pub use wordbook::{
    CsvExport, ImportedWord, MoveWords, NewWord, NewWordbook, WordRef, WordbookDetail,
    WordbookPatch, WordbookService,
};

use crate::auth::VerifiedIdentity;
use crate::data::{Author, Database};
use crate::error::AppError;

/// Name used for authors without display name or email
pub const ANONYMOUS: &str = "Anonymous";

/// A required text field: missing or blank is a validation error
pub(crate) fn require_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Author stamp for the caller
///
/// Name is the stored display name, else the email, else "Anonymous".
pub(crate) async fn author_for(
    db: &Database,
    identity: &VerifiedIdentity,
) -> Result<Author, AppError> {
    let user = db.get_user(&identity.uid).await?;
    let (display_name, email, photo_url) = match user {
        Some(user) => (user.display_name, user.email, user.photo_url),
        None => (
            identity.name.clone(),
            identity.email.clone(),
            identity.picture.clone(),
        ),
    };

    let name = non_empty(display_name)
        .or_else(|| non_empty(email))
        .unwrap_or_else(|| ANONYMOUS.to_string());

    Ok(Author {
        uid: identity.uid.clone(),
        name,
        photo_url: photo_url.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_rejects_blank() {
        assert!(require_text(None, "title").is_err());
        assert!(require_text(Some("   ".into()), "title").is_err());
        assert_eq!(require_text(Some("Hi".into()), "title").unwrap(), "Hi");
    }
}
