use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::REQUEST_ID_HEADER;

/// Correlation id assigned to an inbound request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Assigns a fresh id to every request and echoes it in the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Logs one line per request once the response is ready.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;
    let elapsed = started.elapsed();
    tracing::debug!(
        target: "species_gateway::access",
        %method,
        %path,
        status = response.status().as_u16(),
        ?elapsed,
        "{method}: {path} - {} - {elapsed:?}",
        response.status().as_u16(),
    );
    response
}
