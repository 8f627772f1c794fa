use std::fmt;

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

/// Header carrying the per-call correlation id (`X-Request-ID`).
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum number of body bytes kept in an error sample.
pub(crate) const BODY_SAMPLE_SIZE: usize = 500;

/// Closed taxonomy of failure reasons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownError,
    InvalidRequest,
    Forbidden,
    Unauthorized,
    NotFound,
    InvalidOperation,
    ResourceConflict,
    InvalidContentType,
    ValidationError,
    RateLimitExceeded,
    ServerError,
    ServerUnavailable,
    EncodingError,
    RequestError,
    HttpClientError,
}

impl ErrorCode {
    /// Maps an upstream status code onto the taxonomy.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::InvalidRequest,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => Self::InvalidOperation,
            StatusCode::CONFLICT => Self::ResourceConflict,
            StatusCode::PRECONDITION_FAILED => Self::InvalidContentType,
            StatusCode::UNPROCESSABLE_ENTITY => Self::ValidationError,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimitExceeded,
            StatusCode::INTERNAL_SERVER_ERROR => Self::ServerError,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Self::ServerUnavailable
            }
            _ => Self::UnknownError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownError => "unknown_error",
            Self::InvalidRequest => "invalid_request",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InvalidOperation => "invalid_operation",
            Self::ResourceConflict => "resource_conflict",
            Self::InvalidContentType => "invalid_content_type",
            Self::ValidationError => "validation_error",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::ServerError => "server_error",
            Self::ServerUnavailable => "server_unavailable",
            Self::EncodingError => "encoding_error",
            Self::RequestError => "request_error",
            Self::HttpClientError => "http_client_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of an [`ApiError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be built or no response was received.
    Transport,
    /// A payload could not be encoded or a response could not be decoded.
    Encoding,
    /// The upstream answered with an error status.
    Upstream { status: StatusCode, code: ErrorCode },
}

/// Normalized error returned by every failing client call.
///
/// `status_code` is `0` when no response was received. `request` holds a
/// sample of the request body when one was sent, `response` a sample of the
/// response body when one was read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub status_code: u16,
    pub method: String,
    pub resource: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Builds an error for a call that failed before a request existed.
    pub(crate) fn from_source(
        code: ErrorCode,
        resource: &str,
        method: &Method,
        request_id: &str,
        source: impl fmt::Display,
    ) -> Self {
        Self {
            code,
            status_code: 0,
            method: method.as_str().to_owned(),
            resource: resource.to_owned(),
            request_id: request_id.to_owned(),
            request: None,
            response: None,
            source: Some(source.to_string()),
        }
    }

    /// Builds an error from a built request, without response data.
    pub(crate) fn from_request(request: &reqwest::Request) -> Self {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        Self {
            code: ErrorCode::UnknownError,
            status_code: 0,
            method: request.method().as_str().to_owned(),
            resource: request.url().path().to_owned(),
            request_id: request_id.to_owned(),
            request: request
                .body()
                .and_then(|body| body.as_bytes())
                .map(sample),
            response: None,
            source: None,
        }
    }

    pub(crate) fn from_request_and_source(
        request: &reqwest::Request,
        code: ErrorCode,
        source: impl fmt::Display,
    ) -> Self {
        Self {
            code,
            source: Some(source.to_string()),
            ..Self::from_request(request)
        }
    }

    /// Builds an error from an upstream response; `body` is the response body read so far.
    pub(crate) fn from_response(
        request: &reqwest::Request,
        status: StatusCode,
        body: &[u8],
    ) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status_code: status.as_u16(),
            response: Some(sample(body)),
            ..Self::from_request(request)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code {
            ErrorCode::RequestError | ErrorCode::HttpClientError => ErrorKind::Transport,
            ErrorCode::EncodingError => ErrorKind::Encoding,
            code => ErrorKind::Upstream {
                status: self.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                code,
            },
        }
    }

    /// Upstream status, `None` when no response was received.
    pub fn status(&self) -> Option<StatusCode> {
        if self.status_code == 0 {
            return None;
        }
        StatusCode::from_u16(self.status_code).ok()
    }
}

/// Returns at most [`BODY_SAMPLE_SIZE`] bytes of `body`, marking clipped samples with `...`.
pub(crate) fn sample(body: &[u8]) -> String {
    if body.len() < BODY_SAMPLE_SIZE {
        return String::from_utf8_lossy(body).into_owned();
    }

    let mut clipped = String::from_utf8_lossy(&body[..BODY_SAMPLE_SIZE]).into_owned();
    clipped.push_str("...");
    clipped
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};

    use super::{sample, ApiError, ErrorCode, ErrorKind, BODY_SAMPLE_SIZE, REQUEST_ID_HEADER};

    fn request(body: Option<Vec<u8>>) -> reqwest::Request {
        let url = "http://localhost:5555/path".parse().expect("url must parse");
        let mut request = reqwest::Request::new(Method::GET, url);
        request.headers_mut().insert(
            REQUEST_ID_HEADER,
            "12345".parse().expect("header value must parse"),
        );
        if let Some(body) = body {
            *request.body_mut() = Some(body.into());
        }
        request
    }

    #[test]
    fn from_response_keeps_short_samples_unclipped() {
        let err = ApiError::from_response(
            &request(Some(vec![b'a'; 100])),
            StatusCode::BAD_REQUEST,
            &[b'a'; 100],
        );

        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(err.status_code, 400);
        assert_eq!(err.request_id, "12345");
        assert_eq!(err.method, "GET");
        assert_eq!(err.resource, "/path");
        assert_eq!(err.request.as_deref().map(str::len), Some(100));
        assert_eq!(err.response.as_deref().map(str::len), Some(100));
        assert!(err.source.is_none());
    }

    #[test]
    fn from_response_without_request_body_has_no_request_sample() {
        let err = ApiError::from_response(&request(None), StatusCode::BAD_REQUEST, b"nope");
        assert!(err.request.is_none());
        assert_eq!(err.response.as_deref(), Some("nope"));
    }

    #[test]
    fn status_codes_map_onto_taxonomy() {
        let cases = [
            (StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest),
            (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            (StatusCode::METHOD_NOT_ALLOWED, ErrorCode::InvalidOperation),
            (StatusCode::CONFLICT, ErrorCode::ResourceConflict),
            (StatusCode::PRECONDITION_FAILED, ErrorCode::InvalidContentType),
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::ValidationError),
            (StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimitExceeded),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::ServerError),
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServerUnavailable),
            (StatusCode::GATEWAY_TIMEOUT, ErrorCode::ServerUnavailable),
            (StatusCode::IM_A_TEAPOT, ErrorCode::UnknownError),
            (StatusCode::BAD_GATEWAY, ErrorCode::UnknownError),
        ];

        for (status, expected) in cases {
            assert_eq!(ErrorCode::from_status(status), expected, "status {status}");
        }
    }

    #[test]
    fn sample_clips_long_bodies() {
        assert_eq!(sample(&[b'a'; 100]).len(), 100);

        let clipped = sample(&[b'a'; 700]);
        assert_eq!(clipped.len(), BODY_SAMPLE_SIZE + 3);
        assert!(clipped.ends_with("..."));

        assert_eq!(sample(&[]), "");
    }

    #[test]
    fn display_renders_wire_shape() {
        let err = ApiError {
            code: ErrorCode::UnknownError,
            status_code: 418,
            method: "GET".to_owned(),
            resource: "/path".to_owned(),
            request_id: "12345".to_owned(),
            request: Some("a".to_owned()),
            response: Some("a".to_owned()),
            source: None,
        };

        assert_eq!(
            err.to_string(),
            r#"{"code":"unknown_error","status_code":418,"method":"GET","resource":"/path","request_id":"12345","request":"a","response":"a"}"#
        );
    }

    #[test]
    fn from_source_records_message() {
        let err = ApiError::from_source(
            ErrorCode::EncodingError,
            "/path",
            &Method::GET,
            "12345",
            "a request error",
        );

        assert_eq!(err.code, ErrorCode::EncodingError);
        assert_eq!(err.resource, "/path");
        assert_eq!(err.method, "GET");
        assert_eq!(err.request_id, "12345");
        assert_eq!(err.source.as_deref(), Some("a request error"));
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains(r#""response":null"#));
    }

    #[test]
    fn from_request_and_source_overrides_code() {
        let err =
            ApiError::from_request_and_source(&request(None), ErrorCode::RequestError, "boom");
        assert_eq!(err.code, ErrorCode::RequestError);
        assert_eq!(err.request_id, "12345");
        assert_eq!(err.source.as_deref(), Some("boom"));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn kind_separates_upstream_failures() {
        let err = ApiError::from_response(&request(None), StatusCode::NOT_FOUND, b"");
        assert_eq!(
            err.kind(),
            ErrorKind::Upstream {
                status: StatusCode::NOT_FOUND,
                code: ErrorCode::NotFound,
            }
        );

        let mut decode = err.clone();
        decode.code = ErrorCode::EncodingError;
        assert_eq!(decode.kind(), ErrorKind::Encoding);
    }
}
