use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use reqwest::header::{
    HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, HOST,
    USER_AGENT,
};
use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::cache::CachingTransport;
use crate::context::{CallContext, ContextError};
use crate::error::{ApiError, ErrorCode, REQUEST_ID_HEADER};
use crate::format::{Encoder, Json};
use crate::options::ClientOptions;
use crate::query::QueryParameters;
use crate::transport::HttpResponse;

/// Result of a single attempt, classified for the retry decision.
#[derive(Debug)]
enum Outcome {
    Success(HttpResponse),
    Upstream(HttpResponse, ApiError),
    Transport(ApiError),
}

/// Generic outbound HTTP client.
///
/// Every call encodes its value as query parameters (and as the body for
/// writes), applies credentials and fixed headers, retries according to the
/// configured backoff and decodes the response. Failures are always
/// returned as an [`ApiError`].
///
/// Cloning is cheap; clones share options and the response cache.
pub struct Client<E = Json> {
    endpoint: String,
    options: Arc<ClientOptions<E>>,
}

impl<E> Clone for Client<E> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            options: Arc::clone(&self.options),
        }
    }
}

impl<E: Encoder> fmt::Debug for Client<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .finish()
    }
}

impl<E: Encoder> Client<E> {
    /// Creates a client for `endpoint`. The configured transport is wrapped
    /// in a [`CachingTransport`].
    pub fn new(endpoint: impl Into<String>, mut options: ClientOptions<E>) -> Self {
        options.transport = Arc::new(CachingTransport::new(options.transport));
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();

        Self {
            endpoint,
            options: Arc::new(options),
        }
    }

    /// Base URL without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Options shared by every call of this client.
    pub fn options(&self) -> &ClientOptions<E> {
        &self.options
    }

    /// Sends `data` to `path` and decodes the response body into `R`.
    pub async fn call<Q, R>(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        data: &Q,
    ) -> Result<R, ApiError>
    where
        Q: QueryParameters + Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (request, response) = self.execute(ctx, method, path, data).await?;
        self.options
            .encoder
            .decode(response.body.as_ref())
            .map_err(|err| ApiError {
                code: ErrorCode::EncodingError,
                source: Some(err.to_string()),
                ..ApiError::from_response(&request, response.status, &response.body)
            })
    }

    /// Like [`Client::call`], discarding the response body.
    pub async fn call_no_content<Q>(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        data: &Q,
    ) -> Result<(), ApiError>
    where
        Q: QueryParameters + Serialize + ?Sized,
    {
        self.execute(ctx, method, path, data).await.map(|_| ())
    }

    async fn execute<Q>(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        data: &Q,
    ) -> Result<(reqwest::Request, HttpResponse), ApiError>
    where
        Q: QueryParameters + Serialize + ?Sized,
    {
        let request_id = Uuid::new_v4().to_string();
        let path = normalise_path(path);

        let scoped;
        let ctx = match self.options.timeout {
            Some(timeout) => {
                scoped = ctx.with_timeout(timeout);
                &scoped
            }
            None => ctx,
        };

        let query = data.to_query_parameters().map_err(|err| {
            ApiError::from_source(ErrorCode::EncodingError, &path, &method, &request_id, err)
        })?;

        let request = self.build_request(&method, &path, &request_id, query, data)?;

        self.options.logger.info(format_args!(
            "requesting {} {}{}",
            method, self.endpoint, path
        ));

        let mut retries = 0;
        loop {
            let started = Instant::now();
            let attempt = request.try_clone().ok_or_else(|| {
                ApiError::from_request_and_source(
                    &request,
                    ErrorCode::RequestError,
                    "request body cannot be replayed",
                )
            })?;

            let result = ctx.run(self.options.transport.round_trip(attempt)).await;
            self.options.logger.info(format_args!(
                "request completed in {:?} (retry: {})",
                started.elapsed(),
                retries
            ));

            let outcome = match result {
                Err(err) => return Err(self.abort(&request, err)),
                Ok(Ok(response)) if response.status.as_u16() >= 400 => {
                    let err = ApiError::from_response(&request, response.status, &response.body);
                    Outcome::Upstream(response, err)
                }
                Ok(Ok(response)) => Outcome::Success(response),
                Ok(Err(err)) => Outcome::Transport(ApiError::from_request_and_source(
                    &request,
                    ErrorCode::HttpClientError,
                    err,
                )),
            };

            if !should_retry(&outcome, retries, self.options.max_retries) {
                return match outcome {
                    Outcome::Success(response) => Ok((request, response)),
                    Outcome::Upstream(_, err) | Outcome::Transport(err) => {
                        self.options
                            .logger
                            .error(format_args!("request failed with error: {err}"));
                        Err(err)
                    }
                };
            }

            let delay = self.options.backoff.next(retries);
            retries += 1;
            self.options.logger.warn(format_args!(
                "initiating retry {} for request {} {} after sleeping {:?}",
                retries,
                request.method(),
                request.url(),
                delay
            ));

            if let Err(err) = ctx.run(tokio::time::sleep(delay)).await {
                return Err(self.abort(&request, err));
            }
        }
    }

    fn build_request<Q>(
        &self,
        method: &Method,
        path: &str,
        request_id: &str,
        query: Vec<(String, String)>,
        data: &Q,
    ) -> Result<reqwest::Request, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let mut url = Url::parse(&format!("{}{}", self.endpoint, path)).map_err(|err| {
            ApiError::from_source(ErrorCode::RequestError, path, method, request_id, err)
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(&query);
        }

        let mut request = reqwest::Request::new(method.clone(), url);
        let request_id_value = HeaderValue::from_str(request_id).map_err(|err| {
            ApiError::from_source(ErrorCode::RequestError, path, method, request_id, err)
        })?;
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER, request_id_value);

        if let Some(credentials) = &self.options.credentials {
            credentials.apply(&mut request);
        }

        let encoder = &self.options.encoder;
        let body = if sends_body(method) {
            set_header(&mut request, CONTENT_TYPE, encoder.content_type())?;
            let encoded = encoder.encode(data).map_err(|err| {
                ApiError::from_request_and_source(&request, ErrorCode::EncodingError, err)
            })?;
            Some(encoded)
        } else {
            None
        };

        let host = match (request.url().host_str(), request.url().port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => String::new(),
        };
        if !host.is_empty() {
            set_header(&mut request, HOST, &host)?;
        }
        set_header(&mut request, ACCEPT, encoder.accept())?;
        if !self.options.language.is_empty() {
            set_header(&mut request, ACCEPT_LANGUAGE, &self.options.language)?;
        }
        if !self.options.user_agent.is_empty() {
            set_header(&mut request, USER_AGENT, &self.options.user_agent)?;
        }

        if let Some(body) = body {
            request
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            *request.body_mut() = Some(body.into());
        }

        Ok(request)
    }

    fn abort(&self, request: &reqwest::Request, err: ContextError) -> ApiError {
        let err = ApiError::from_request_and_source(request, ErrorCode::HttpClientError, err);
        self.options
            .logger
            .error(format_args!("request failed with error: {err}"));
        err
    }
}

fn set_header(
    request: &mut reqwest::Request,
    name: HeaderName,
    value: &str,
) -> Result<(), ApiError> {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            request.headers_mut().insert(name, value);
            Ok(())
        }
        Err(err) => Err(ApiError::from_request_and_source(
            request,
            ErrorCode::RequestError,
            format_args!("invalid {name} header: {err}"),
        )),
    }
}

fn normalise_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

fn sends_body(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || *method == Method::DELETE
}

/// Decides whether another attempt should follow `outcome`.
fn should_retry(outcome: &Outcome, retries: u32, max_retries: u32) -> bool {
    if retries >= max_retries {
        return false;
    }

    match outcome {
        Outcome::Transport(_) => true,
        Outcome::Success(_) => false,
        Outcome::Upstream(response, _) => match response.status {
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::BAD_GATEWAY
            | StatusCode::CONFLICT => true,
            // more attempts only add rate-limit pressure
            StatusCode::TOO_MANY_REQUESTS => false,
            _ => true,
        },
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderMap;
    use reqwest::{Method, StatusCode};

    use super::{normalise_path, sends_body, should_retry, Client, Outcome};
    use crate::auth::HeaderToken;
    use crate::error::ApiError;
    use crate::options::ClientOptions;
    use crate::transport::HttpResponse;

    fn upstream(status: StatusCode) -> Outcome {
        let request = reqwest::Request::new(
            Method::GET,
            "http://localhost/path".parse().expect("url must parse"),
        );
        let err = ApiError::from_response(&request, status, b"");
        Outcome::Upstream(HttpResponse::new(status, HeaderMap::new(), ""), err)
    }

    fn transport_failure() -> Outcome {
        let request = reqwest::Request::new(
            Method::GET,
            "http://localhost/path".parse().expect("url must parse"),
        );
        Outcome::Transport(ApiError::from_request_and_source(
            &request,
            crate::error::ErrorCode::HttpClientError,
            "connection refused",
        ))
    }

    #[test]
    fn retries_on_retryable_http_status() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::BAD_GATEWAY,
            StatusCode::CONFLICT,
        ] {
            assert!(should_retry(&upstream(status), 0, 2), "status {status}");
        }
    }

    #[test]
    fn does_not_retry_rate_limited_or_successful_attempts() {
        assert!(!should_retry(&upstream(StatusCode::TOO_MANY_REQUESTS), 0, 2));
        let ok = Outcome::Success(HttpResponse::new(StatusCode::OK, HeaderMap::new(), "{}"));
        assert!(!should_retry(&ok, 0, 2));
    }

    #[test]
    fn other_error_statuses_fall_back_to_retry() {
        assert!(should_retry(&upstream(StatusCode::NOT_FOUND), 0, 2));
        assert!(should_retry(&upstream(StatusCode::BAD_REQUEST), 1, 2));
    }

    #[test]
    fn transport_failures_retry_until_limit() {
        assert!(should_retry(&transport_failure(), 0, 2));
        assert!(should_retry(&transport_failure(), 1, 2));
        assert!(!should_retry(&transport_failure(), 2, 2));
        assert!(!should_retry(&upstream(StatusCode::INTERNAL_SERVER_ERROR), 0, 0));
    }

    #[test]
    fn paths_always_start_with_slash() {
        assert_eq!(normalise_path("pokemon"), "/pokemon");
        assert_eq!(normalise_path("/pokemon"), "/pokemon");
        assert_eq!(normalise_path(""), "/");
    }

    #[test]
    fn only_writes_carry_a_body() {
        assert!(sends_body(&Method::POST));
        assert!(sends_body(&Method::PUT));
        assert!(sends_body(&Method::PATCH));
        assert!(sends_body(&Method::DELETE));
        assert!(!sends_body(&Method::GET));
        assert!(!sends_body(&Method::HEAD));
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let client = Client::new("http://localhost:8080/api/", ClientOptions::default());
        assert_eq!(client.endpoint(), "http://localhost:8080/api");
    }

    #[test]
    fn debug_redacts_credentials() {
        let token = HeaderToken::new("x-api-secret", "secret-token").expect("valid header");
        let options = ClientOptions::default().with_credentials(token);
        let client = Client::new("http://localhost", options);
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
