//! Request body extractor

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections answer with the API's error body
///
/// Body rejections become `400 Validation` instead of axum's 415/422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
