use axum::http::StatusCode;

use crate::error::{ApiError, ErrorCode};

/// Failure of a route handler, rendered into the error envelope.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Upstream(#[from] ApiError),
    #[error("{0}")]
    InvalidRequest(String),
}

impl HandlerError {
    /// Best-effort status: the upstream status when one was received.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(err) => err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Upstream(err) => err.code,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Message shown to callers; upstream details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            Self::Upstream(err) => err.code.to_string(),
            Self::InvalidRequest(message) => message.clone(),
        }
    }
}
