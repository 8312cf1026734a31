//! Bearer token authentication
//!
//! Handles:
//! - ID token verification
//! - Authentication extractor

mod middleware;
pub mod provider;

pub use middleware::{CurrentUser, extract_bearer_token};
pub use provider::{
    HmacIdentityProvider, IdTokenClaims, IdentityProvider, VerifiedIdentity, create_id_token,
    verify_id_token,
};
