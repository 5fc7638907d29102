use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::routes::reply::json_reply;

/// Failure of the backing key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store lock poisoned")]
    Poisoned,

    #[cfg(feature = "redis_store")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Failure of the welcome email provider call.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider rejected the message with status {0}")]
    Rejected(reqwest::StatusCode),
}

/// Outcome of a rejected signup.
///
/// Mail failures are deliberately absent: they never leave the recorder.
#[derive(Error, Debug)]
pub enum SignupError {
    #[error("invalid_email")]
    InvalidEmail,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config.json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Store backend `{0}` is not available in this build")]
    UnsupportedBackend(String),

    #[error("Failed to open store: {0}")]
    Store(#[from] StoreError),
}

/// Error returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Signup(#[from] SignupError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Signup(SignupError::InvalidEmail) => json_reply(
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "error": "invalid_email" }),
            ),
            AppError::Signup(SignupError::Store(err)) | AppError::Store(err) => {
                tracing::error!("Store failure: {err}");
                json_reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": "internal_error" }),
                )
            }
        }
    }
}
