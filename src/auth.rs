//! Credential providers applied to outbound requests.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{self, HeaderName, HeaderValue, AUTHORIZATION};

/// A credential that cannot be turned into a valid request header.
///
/// The offending value is never included, only the header name.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("invalid header name {name:?}: {source}")]
    InvalidHeaderName {
        name: String,
        source: header::InvalidHeaderName,
    },
    #[error("invalid value for header {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        source: header::InvalidHeaderValue,
    },
}

/// Applies an authentication scheme to a request before it is sent.
pub trait Credentials: fmt::Debug + Send + Sync {
    fn apply(&self, request: &mut reqwest::Request);
}

/// Username and password sent through the `Authorization: Basic` header.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials for BasicAuth {
    fn apply(&self, request: &mut reqwest::Request) {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        if let Ok(mut value) = HeaderValue::from_str(&format!("Basic {encoded}")) {
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
    }
}

/// A fixed header, used for bearer tokens and custom secret headers.
#[derive(Clone)]
pub struct HeaderToken {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderToken {
    /// Returns `Ok(None)` when either side is empty, so optional tokens can
    /// be passed straight through. A non-empty name or value that is not
    /// valid in a header is an error rather than a silent downgrade to no
    /// credentials.
    pub fn new(name: &str, value: &str) -> Result<Option<Self>, CredentialsError> {
        if name.is_empty() || value.is_empty() {
            return Ok(None);
        }

        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
            CredentialsError::InvalidHeaderName {
                name: name.to_owned(),
                source,
            }
        })?;
        let mut value =
            HeaderValue::from_str(value).map_err(|source| CredentialsError::InvalidHeaderValue {
                name: name.to_string(),
                source,
            })?;
        value.set_sensitive(true);
        Ok(Some(Self { name, value }))
    }

    /// `Authorization: Bearer <token>`; `Ok(None)` for an empty token.
    pub fn bearer(token: &str) -> Result<Option<Self>, CredentialsError> {
        if token.is_empty() {
            return Ok(None);
        }
        Self::new(AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }
}

impl fmt::Debug for HeaderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderToken")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl Credentials for HeaderToken {
    fn apply(&self, request: &mut reqwest::Request) {
        request
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());
    }
}

/// A query string parameter, overwriting any existing value for the key.
#[derive(Clone)]
pub struct QueryToken {
    key: String,
    value: String,
}

impl QueryToken {
    /// Returns `None` when either side is empty.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Option<Self> {
        let (key, value) = (key.into(), value.into());
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self { key, value })
    }
}

impl fmt::Debug for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryToken")
            .field("key", &self.key)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl Credentials for QueryToken {
    fn apply(&self, request: &mut reqwest::Request) {
        let url = request.url_mut();
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != self.key.as_str())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair(&self.key, &self.value);
    }
}
