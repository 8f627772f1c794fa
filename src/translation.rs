//! Text translations through the funtranslations API.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::auth::{CredentialsError, HeaderToken};
use crate::client::Client;
use crate::context::CallContext;
use crate::error::ApiError;
use crate::format::{Encoder, FormatError, Json};
use crate::options::ClientOptions;
use crate::query::{QueryPairs, QueryParameters};
use crate::text::escape_path_segment;

pub const DEFAULT_ENDPOINT: &str = "https://api.funtranslations.com/translate";

/// Header carrying the API secret on paid plans.
pub const AUTH_HEADER: &str = "X-Funtranslations-Api-Secret";

const USER_AGENT: &str = "species-gateway/translation";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranslationMethod {
    Shakespeare,
    Yoda,
}

impl TranslationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shakespeare => "shakespeare",
            Self::Yoda => "yoda",
        }
    }
}

impl fmt::Display for TranslationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid translation method: {0:?}")]
pub struct UnknownTranslationMethod(pub String);

impl FromStr for TranslationMethod {
    type Err = UnknownTranslationMethod;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [Self::Shakespeare, Self::Yoda]
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownTranslationMethod(value.to_owned()))
    }
}

impl Serialize for TranslationMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TranslationMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Query for a translation; the text travels in the query string only.
#[derive(Clone, Debug, Serialize)]
struct TranslateRequest<'a> {
    #[serde(skip)]
    text: &'a str,
}

impl QueryParameters for TranslateRequest<'_> {
    fn to_query_parameters(&self) -> Result<QueryPairs, FormatError> {
        Ok(vec![("text".to_owned(), self.text.to_owned())])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSuccess {
    #[serde(default)]
    pub total: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationContents {
    pub translated: String,
    #[serde(default)]
    pub text: String,
    pub translation: TranslationMethod,
}

/// Upstream translation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResponse {
    #[serde(default)]
    pub success: TranslationSuccess,
    pub contents: TranslationContents,
}

#[derive(Clone, Debug)]
pub struct TranslationClient {
    client: Client<Json>,
}

impl TranslationClient {
    /// An empty `token` uses the unauthenticated free plan. A token that is
    /// not a valid header value is rejected.
    pub fn new<E: Encoder>(
        token: &str,
        options: ClientOptions<E>,
    ) -> Result<Self, CredentialsError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, token, options)
    }

    pub fn with_endpoint<E: Encoder>(
        endpoint: impl Into<String>,
        token: &str,
        options: ClientOptions<E>,
    ) -> Result<Self, CredentialsError> {
        let options = options
            .with_encoder(Json)
            .with_user_agent(USER_AGENT)
            .with_credentials(HeaderToken::new(AUTH_HEADER, token)?);

        Ok(Self {
            client: Client::new(endpoint, options),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Translates `input` and returns the translated text.
    pub async fn translate(
        &self,
        ctx: &CallContext,
        input: &str,
        method: TranslationMethod,
    ) -> Result<String, ApiError> {
        let path = format!("/{}.json", escape_path_segment(method.as_str()));
        let response: TranslationResponse = self
            .client
            .call(ctx, Method::GET, &path, &TranslateRequest { text: input })
            .await?;
        Ok(response.contents.translated)
    }
}
