//! Error normalization for the API service
//!
//! Every failure raised while handling a request ends up as an [`ApiError`],
//! and every [`ApiError`] renders as `{ "success": false, "message": ... }`
//! with the status code of its class.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{DatabaseError, StorageError};
use jsonwebtoken::errors::ErrorKind;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// One or more fields are missing or malformed
    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    /// The identifier does not resolve to a document
    #[error("{0} not found.")]
    NotFound(&'static str),

    /// No route matches the request
    #[error("Route not found.")]
    RouteNotFound,

    /// A path segment is not a valid identifier
    #[error("Invalid {path}: {value}")]
    InvalidId { path: &'static str, value: String },

    /// A unique field already holds the submitted value
    #[error("Duplicate {} entered", .0.join(", "))]
    DuplicateKey(Vec<String>),

    /// The session token is invalid or expired
    #[error("{}", auth_token_message(.0))]
    AuthToken(#[from] jsonwebtoken::errors::Error),

    /// No session token was presented
    #[error("User not authenticated.")]
    Unauthenticated,

    /// Login with unknown email or wrong password
    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// A remote asset operation failed
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    /// Document store failure
    #[error("Database error: {0}")]
    Database(DatabaseError),

    /// Anything unclassified
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn auth_token_message(error: &jsonwebtoken::errors::Error) -> &'static str {
    match error.kind() {
        ErrorKind::ExpiredSignature => "Json Web Token is expired, try again!",
        _ => "Json Web Token is invalid, try again!",
    }
}

impl ApiError {
    /// A validation failure with a single message
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(vec![message.into()])
    }

    /// Status code of the error class
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidId { .. }
            | ApiError::DuplicateKey(_)
            | ApiError::AuthToken(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to the client
    fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) | ApiError::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::UniqueViolation { fields } => ApiError::DuplicateKey(fields),
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "message": self.public_message(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
