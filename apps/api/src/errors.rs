use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::backend_client::BackendError;
use crate::survey::error::SurveyError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("No questions available: {0}")]
    NoQuestions(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SurveyError> for AppError {
    fn from(err: SurveyError) -> Self {
        match err {
            SurveyError::Validation(messages) => AppError::Validation(messages),
            e @ SurveyError::UnknownOption { .. } => AppError::Validation(vec![e.to_string()]),
            e @ SurveyError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
            e @ SurveyError::NoQuestions { .. } => AppError::NoQuestions(e.to_string()),
        }
    }
}

impl AppError {
    /// Message shown to the respondent in the session's error state.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Backend(BackendError::UnexpectedShape { reason, .. }) => {
                format!("The recommendation service sent an unexpected response: {reason}")
            }
            AppError::Backend(_) => {
                "The recommendation service is unavailable. Please try again.".to_string()
            }
            AppError::Internal(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Some required answers are missing or invalid".to_string(),
            ),
            AppError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
            }
            AppError::NoQuestions(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_QUESTIONS",
                msg.clone(),
            ),
            AppError::Backend(e) => {
                tracing::error!("Backend error: {e}");
                (StatusCode::BAD_GATEWAY, "BACKEND_ERROR", self.user_message())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    self.user_message(),
                )
            }
        };

        let details = match &self {
            AppError::Validation(messages) => messages.clone(),
            _ => Vec::new(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "details": details
            }
        }));

        (status, body).into_response()
    }
}
