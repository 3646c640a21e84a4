use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{repository::RepositoryError, storage::StorageError};

/// ErrorEnvelope
///
/// The single error body shape returned by every endpoint:
/// `{"status": "error", "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
}

/// ApiError
///
/// Every handler returns `Result<_, ApiError>`. The variant decides the HTTP status;
/// server-side failures are logged and replaced with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// Aggregated field messages from the validation layer.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Unauthorized("authentication required".to_string())
    }

    pub fn access_denied() -> Self {
        ApiError::Forbidden("access denied".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Repository(RepositoryError::UniqueViolation(_)) => StatusCode::CONFLICT,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Repository(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message exposed to the client. 5xx causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Repository(RepositoryError::UniqueViolation(what)) => {
                format!("{} already exists", what)
            }
            ApiError::Storage(StorageError::NotFound(_)) => "file not found".to_string(),
            ApiError::Repository(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                "an unexpected error has occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(join_validation_messages(&errors))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error.cause_chain = ?self, error.message = %self, "request failed");
        } else {
            tracing::debug!(status = %status, message = %self, "request rejected");
        }

        let body = ErrorEnvelope {
            status: "error".to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Flattens validator output into one `", "`-joined sentence, ordered by field name so
/// the message is stable. Struct-level (schema) errors come last.
pub fn join_validation_messages(errors: &ValidationErrors) -> String {
    let mut fields: Vec<(String, Vec<String>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let field = field.to_string();
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
                .collect();
            (field, messages)
        })
        .collect();

    fields.sort_by(|a, b| {
        let a_schema = a.0 == "__all__";
        let b_schema = b.0 == "__all__";
        a_schema.cmp(&b_schema).then_with(|| a.0.cmp(&b.0))
    });

    fields
        .into_iter()
        .flat_map(|(_, messages)| messages)
        .collect::<Vec<_>>()
        .join(", ")
}
