use crate::services::error::ReconcileError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub const FIX_HEADERS_FAILED: &str = "fix object headers failed";
pub const PROTECT_FILES_FAILED: &str = "protect file set ACL private failed";
pub const OPEN_BUCKET_FAILED: &str = "open storage bucket failed";
pub const HOOK_NOT_HANDLED: &str = "record hook not handled";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: ReconcileError,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn internal(message: &'static str, source: ReconcileError) -> Self {
        AppError::Internal { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// The reconciliation failure behind an internal error.
    pub fn cause(&self) -> Option<&ReconcileError> {
        match self {
            AppError::Internal { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal { message, source } => {
                tracing::error!("{}: {:?}", message, anyhow::Error::from(source));
                message.to_string()
            }
            AppError::Unauthorized(msg) => msg,
            AppError::BadRequest(msg) => msg,
            AppError::NotFound(msg) => msg,
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
