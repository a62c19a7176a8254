use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use validator::ValidationErrors;

use crate::forms;
use crate::identity::AuthClientError;

/// AppError
///
/// Failure of a write handler. Read handlers keep answering with bare status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(#[from] ValidationErrors),
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("unauthorized")]
    Unauthorized,
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("auth service error: {0}")]
    Auth(#[from] AuthClientError),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized | AppError::Auth(AuthClientError::InvalidCredentials) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match self {
            AppError::Validation(errors) => ErrorBody {
                error: "validation failed".to_string(),
                fields: Some(forms::field_messages(&errors)),
            },
            // Upstream and database details stay in the logs.
            AppError::Database(_) | AppError::Storage(_) => ErrorBody {
                error: "internal error".to_string(),
                fields: None,
            },
            AppError::Auth(AuthClientError::InvalidCredentials) => ErrorBody {
                error: "Email o contraseña incorrectos.".to_string(),
                fields: None,
            },
            AppError::Auth(_) => ErrorBody {
                error: "auth service unavailable".to_string(),
                fields: None,
            },
            other => ErrorBody {
                error: other.to_string(),
                fields: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
