use std::sync::{PoisonError, RwLock};

use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::error::HandlerError;
use crate::error::ErrorCode;
use crate::format::{Encoder, Format};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "response")]
struct Envelope<'a, T> {
    request_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
}

/// Writes response envelopes in the active format.
///
/// The format can be switched at runtime; every write takes the read lock
/// for the duration of encoding.
#[derive(Debug, Default)]
pub struct Responder {
    format: RwLock<Format>,
}

impl Responder {
    pub fn new(format: Format) -> Self {
        Self {
            format: RwLock::new(format),
        }
    }

    pub fn format(&self) -> Format {
        *self.format.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_format(&self, format: Format) {
        *self.format.write().unwrap_or_else(PoisonError::into_inner) = format;
    }

    pub fn respond_ok<T: Serialize>(&self, request_id: &str, data: &T) -> Response {
        self.write(
            StatusCode::OK,
            &Envelope {
                request_id,
                error: None,
                data: Some(data),
            },
        )
    }

    pub fn respond_error(&self, request_id: &str, err: &HandlerError) -> Response {
        let envelope: Envelope<'_, ()> = Envelope {
            request_id,
            error: Some(ErrorBody {
                error: err.message(),
                code: Some(err.code()),
            }),
            data: None,
        };
        self.write(err.status(), &envelope)
    }

    fn write<T: Serialize>(&self, status: StatusCode, envelope: &Envelope<'_, T>) -> Response {
        let format = self.format.read().unwrap_or_else(PoisonError::into_inner);

        let mut body = Vec::new();
        if let Err(err) = format.encode_into(&mut body, envelope) {
            tracing::error!(
                request_id = envelope.request_id,
                error = %err,
                "could not encode receiver into response"
            );
            body.clear();
        }

        (status, [(CONTENT_TYPE, format.content_type().to_owned())], body).into_response()
    }
}
