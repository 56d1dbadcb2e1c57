use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the service.
///
/// A rejected request is not an error: the gate answers it with a 429
/// directly, see [`crate::rate_limiter::AdmitDecision`].
#[derive(Debug, Error)]
pub enum NaasError {
    /// Invalid startup configuration. Fatal.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid language: {0}")]
    InvalidLanguage(String),

    #[error("Reason store error: {0}")]
    ReasonStore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NaasError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_error(err: &NaasError) -> Self {
        match err {
            NaasError::Configuration(msg) => Self::new("configuration_error", msg, 500),
            NaasError::InvalidLanguage(lang) => Self::new("bad_request", lang, 400),
            NaasError::ReasonStore(msg) => Self::new("internal_error", msg, 500),
            NaasError::Io(e) => Self::new("internal_error", &e.to_string(), 500),
        }
    }
}

impl IntoResponse for NaasError {
    fn into_response(self) -> Response {
        match self {
            // Clients only ever see the bare message for a bad language.
            NaasError::InvalidLanguage(_) => {
                (StatusCode::BAD_REQUEST, Json("Invalid language")).into_response()
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                let body = ErrorResponse::from_error(&other);
                let status = StatusCode::from_u16(body.code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(body)).into_response()
            }
        }
    }
}
