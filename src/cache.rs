//! In-memory HTTP response cache wrapped around a [`Transport`].
//!
//! Follows the usual private-cache rules: `Cache-Control` freshness,
//! `Expires`, validation through `ETag`/`Last-Modified`, and `Vary`.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, CONNECTION, DATE, ETAG, EXPIRES,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, RANGE, VARY,
};
use reqwest::{Method, StatusCode};

use crate::transport::{HttpResponse, Transport, TransportError};

/// Header set to `1` on responses served from the cache (`X-From-Cache`).
pub const FROM_CACHE_HEADER: &str = "x-from-cache";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Freshness {
    Fresh,
    Stale,
    Transparent,
}

/// Parsed `Cache-Control` directives; names are lowercased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CacheControl(Vec<(String, Option<String>)>);

impl CacheControl {
    fn from_headers(headers: &HeaderMap) -> Self {
        let mut directives = Vec::new();
        for value in headers.get_all(CACHE_CONTROL) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for part in value.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                match part.split_once('=') {
                    Some((name, arg)) => directives.push((
                        name.trim().to_ascii_lowercase(),
                        Some(arg.trim().trim_matches('"').to_owned()),
                    )),
                    None => directives.push((part.to_ascii_lowercase(), None)),
                }
            }
        }
        Self(directives)
    }

    fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(directive, _)| directive == name)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(directive, _)| directive == name)
            .and_then(|(_, value)| value.as_deref())
    }

    fn seconds(&self, name: &str) -> Option<Duration> {
        self.value(name)
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    response: HttpResponse,
    stored_at: SystemTime,
    varied: Vec<(HeaderName, Option<HeaderValue>)>,
}

impl CacheEntry {
    fn matches(&self, request: &HeaderMap) -> bool {
        self.varied
            .iter()
            .all(|(name, value)| request.get(name) == value.as_ref())
    }

    fn served(&self) -> HttpResponse {
        let mut response = self.response.clone();
        response
            .headers
            .insert(FROM_CACHE_HEADER, HeaderValue::from_static("1"));
        response
    }
}

/// Transport decorator answering cacheable requests from memory.
///
/// Only `GET` and `HEAD` requests without a `Range` header are served from
/// the cache. The store is shared by every clone and is safe to use from
/// concurrent calls.
#[derive(Clone, Debug)]
pub struct CachingTransport {
    inner: Arc<dyn Transport>,
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl CachingTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored responses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl Transport for CachingTransport {
    async fn round_trip(
        &self,
        mut request: reqwest::Request,
    ) -> Result<HttpResponse, TransportError> {
        let key = cache_key(&request);
        let method = request.method().clone();
        let request_headers = request.headers().clone();
        let cacheable = (method == Method::GET || method == Method::HEAD)
            && !request_headers.contains_key(RANGE);
        let cached = if cacheable { self.lookup(&key) } else { None };

        let response = match cached {
            Some(entry) => {
                if entry.matches(&request_headers) {
                    let now = SystemTime::now();
                    match freshness(&entry.response.headers, entry.stored_at, &request_headers, now)
                    {
                        Freshness::Fresh => return Ok(entry.served()),
                        Freshness::Stale => add_validators(&mut request, &entry.response.headers),
                        Freshness::Transparent => {}
                    }
                }

                match self.inner.round_trip(request).await {
                    Ok(response)
                        if method == Method::GET && response.status == StatusCode::NOT_MODIFIED =>
                    {
                        let mut merged = entry;
                        for (name, value) in end_to_end(&response.headers) {
                            merged.response.headers.insert(name, value);
                        }
                        merged.served()
                    }
                    Ok(response) => {
                        if response.status != StatusCode::OK {
                            self.entries.remove(&key);
                        }
                        response
                    }
                    Err(err) => {
                        self.entries.remove(&key);
                        return Err(err);
                    }
                }
            }
            None if CacheControl::from_headers(&request_headers).has("only-if-cached") => {
                return Ok(gateway_timeout());
            }
            None => self.inner.round_trip(request).await?,
        };

        let storable = cacheable
            && response.status == StatusCode::OK
            && !CacheControl::from_headers(&request_headers).has("no-store")
            && !CacheControl::from_headers(&response.headers).has("no-store");
        if storable {
            self.store(key, response.clone(), &request_headers);
        } else {
            self.entries.remove(&key);
        }

        Ok(response)
    }
}

impl CachingTransport {
    fn store(&self, key: String, mut response: HttpResponse, request: &HeaderMap) {
        response.headers.remove(FROM_CACHE_HEADER);
        let varied = vary_names(&response.headers)
            .into_iter()
            .map(|name| {
                let value = request.get(&name).cloned();
                (name, value)
            })
            .collect();

        self.entries.insert(
            key,
            CacheEntry {
                response,
                stored_at: SystemTime::now(),
                varied,
            },
        );
    }
}

fn cache_key(request: &reqwest::Request) -> String {
    if request.method() == Method::GET {
        request.url().to_string()
    } else {
        format!("{} {}", request.method(), request.url())
    }
}

fn gateway_timeout() -> HttpResponse {
    HttpResponse::new(StatusCode::GATEWAY_TIMEOUT, HeaderMap::new(), Bytes::new())
}

fn http_date(headers: &HeaderMap, name: HeaderName) -> Option<SystemTime> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| httpdate::parse_http_date(value).ok())
}

fn freshness(
    response: &HeaderMap,
    stored_at: SystemTime,
    request: &HeaderMap,
    now: SystemTime,
) -> Freshness {
    let response_cc = CacheControl::from_headers(response);
    let request_cc = CacheControl::from_headers(request);

    if request_cc.has("no-cache") {
        return Freshness::Transparent;
    }
    if response_cc.has("no-cache") {
        return Freshness::Stale;
    }
    if request_cc.has("only-if-cached") {
        return Freshness::Fresh;
    }

    let date = http_date(response, DATE).unwrap_or(stored_at);
    let mut current_age = now.duration_since(date).unwrap_or_default();

    let mut lifetime = match response_cc.seconds("max-age") {
        Some(max_age) => max_age,
        None => http_date(response, EXPIRES)
            .and_then(|expires| expires.duration_since(date).ok())
            .unwrap_or_default(),
    };

    if let Some(max_age) = request_cc.seconds("max-age") {
        lifetime = max_age;
    }
    if let Some(min_fresh) = request_cc.seconds("min-fresh") {
        current_age = current_age.saturating_add(min_fresh);
    }
    if request_cc.has("max-stale") {
        match request_cc.seconds("max-stale") {
            Some(max_stale) => current_age = current_age.saturating_sub(max_stale),
            None => return Freshness::Fresh,
        }
    }

    if lifetime > current_age {
        Freshness::Fresh
    } else {
        Freshness::Stale
    }
}

fn add_validators(request: &mut reqwest::Request, cached: &HeaderMap) {
    let headers = request.headers_mut();
    if let Some(etag) = cached.get(ETAG) {
        if !headers.contains_key(IF_NONE_MATCH) {
            headers.insert(IF_NONE_MATCH, etag.clone());
        }
    }
    if let Some(last_modified) = cached.get(LAST_MODIFIED) {
        if !headers.contains_key(IF_MODIFIED_SINCE) {
            headers.insert(IF_MODIFIED_SINCE, last_modified.clone());
        }
    }
}

fn vary_names(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(VARY)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

fn end_to_end(headers: &HeaderMap) -> Vec<(HeaderName, HeaderValue)> {
    let connection: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .collect();

    headers
        .iter()
        .filter(|(name, _)| {
            let name = name.as_str();
            !HOP_BY_HOP.contains(&name) && !connection.iter().any(|hop| hop == name)
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
