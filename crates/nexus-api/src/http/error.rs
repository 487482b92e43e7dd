//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use nexus_types::error::SessionError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session operation errors.
    Session(SessionError),
    /// Authentication failure.
    Unauthorized(String),
    /// Malformed path parameter or body value.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl AppError {
    /// Status, machine-readable code, and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Session(e) => {
                let (status, code) = match e {
                    SessionError::NotFound => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
                    SessionError::SuggestionNotFound(_) => {
                        (StatusCode::NOT_FOUND, "SUGGESTION_NOT_FOUND")
                    }
                    SessionError::TeamNotFound(_) => (StatusCode::NOT_FOUND, "TEAM_NOT_FOUND"),
                    SessionError::BotNotFound(_) => (StatusCode::NOT_FOUND, "BOT_NOT_FOUND"),
                    SessionError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                    SessionError::InvalidPhase { .. } => (StatusCode::BAD_REQUEST, "INVALID_PHASE"),
                    SessionError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    SessionError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                    SessionError::Storage(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                    }
                };
                (status, code, e.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        let request_id = uuid::Uuid::now_v7().to_string();
        let body = ApiResponse::error(code, &message, request_id, 0);
        (status, Json(body)).into_response()
    }
}
