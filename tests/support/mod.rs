//! In-process mock upstream shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(status: StatusCode, body: JsonValue) -> Self {
        Self::text(status, &body.to_string()).with_header("content-type", "application/json")
    }

    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_owned(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_owned()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A request as seen by the mock upstream.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_deref().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }

    pub fn query_value(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockState {
    /// Pops the next queued response; the last one keeps answering.
    fn next_response(&self, path: &str) -> Option<MockResponse> {
        let mut routes = self
            .routes
            .lock()
            .expect("route table mutex must not be poisoned");
        let queue = routes.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

async fn handler(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX)
        .await
        .expect("request body must be readable");

    let recorded = RecordedRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(str::to_owned),
        headers: parts.headers.clone(),
        body,
    };
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(recorded);

    let Some(response) = state.next_response(parts.uri.path()) else {
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("no mock response available"))
            .expect("fallback response must build");
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let revalidated = match (response.header("etag"), parts.headers.get(header::IF_NONE_MATCH)) {
        (Some(etag), Some(candidate)) => candidate.as_bytes() == etag.as_bytes(),
        _ => false,
    };

    let mut builder = Response::builder().status(if revalidated {
        StatusCode::NOT_MODIFIED
    } else {
        response.status
    });
    for (name, value) in &response.headers {
        builder = builder.header(*name, value.as_str());
    }
    let body = if revalidated {
        Body::empty()
    } else {
        Body::from(response.body)
    };
    builder.body(body).expect("mock response must build")
}

/// Mock upstream answering queued responses per path.
pub struct MockUpstream {
    pub base_url: String,
    state: MockState,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(handler).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("must bind test listener");
        let address = listener.local_addr().expect("must have local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock server must run");
        });

        Self {
            base_url: format!("http://{address}"),
            state,
            task,
        }
    }

    /// Queues responses for `path`.
    pub fn respond(&self, path: &str, responses: impl IntoIterator<Item = MockResponse>) {
        self.state
            .routes
            .lock()
            .expect("route table mutex must not be poisoned")
            .entry(path.to_owned())
            .or_default()
            .extend(responses);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }

    pub fn hits(&self) -> usize {
        self.requests().len()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    pub fn host(&self) -> &str {
        self.base_url.trim_start_matches("http://")
    }
}
