//! Data layer module
//!
//! Handles all data persistence and caching:
//! - SQLite database operations
//! - Translation cache (volatile)

mod cache;
mod database;
mod models;

pub use cache::TranslationCache;
pub use database::{Database, DiscussionSort, HOT_LIKES_THRESHOLD};
pub use models::*;
