use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{access::AccessError, codec::CodecError, store::StoreError, token::TokenError};

/// AppError
///
/// Every failure a route can end in. Access-control kinds stay distinct here; the
/// wire only sees the status code and a short JSON string.
#[derive(Error, Debug)]
pub enum AppError {
    /// A gate denied the request.
    #[error("access denied: {0}")]
    Access(#[from] AccessError),

    /// Login failed. Unknown username and wrong password share this variant.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("resource not found")]
    NotFound,

    /// The record store rejected or failed an operation.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("credential codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Access(AccessError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            AppError::Access(_) => StatusCode::FORBIDDEN,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Codec(_) | AppError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Access(AccessError::Unauthenticated) => {
                tracing::debug!("request without credential");
                "You are not authenticated!".to_string()
            }
            AppError::Access(reason @ (AccessError::InvalidToken | AccessError::Expired)) => {
                tracing::warn!("rejected credential: {}", reason);
                "Token is not valid!".to_string()
            }
            AppError::Access(AccessError::Forbidden) => {
                tracing::warn!("authorization failed");
                "You are not allowed to do that!".to_string()
            }
            AppError::InvalidCredentials => "Wrong credentials!".to_string(),
            AppError::Validation(msg) => {
                tracing::debug!("validation error: {}", msg);
                msg.clone()
            }
            AppError::NotFound => "Resource not found".to_string(),
            // Store, codec and signing failures are logged in full but answered opaquely.
            AppError::Persistence(e) => {
                tracing::error!("persistence error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Codec(e) => {
                tracing::error!("credential codec error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Token(e) => {
                tracing::error!("token error: {}", e);
                "Internal server error".to_string()
            }
        };

        (self.status(), Json(message)).into_response()
    }
}
