//! Species lookups against PokéAPI.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::context::CallContext;
use crate::error::ApiError;
use crate::format::{Encoder, Json};
use crate::options::ClientOptions;
use crate::text::escape_path_segment;

pub const DEFAULT_ENDPOINT: &str = "https://pokeapi.co/api/v2";

const USER_AGENT: &str = "species-gateway/pokeapi";

/// Reference to another API resource by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedApiResource {
    pub name: String,
}

/// Localized flavor text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorText {
    pub flavor_text: String,
    #[serde(default)]
    pub language: NamedApiResource,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub habitat: Option<NamedApiResource>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
}

impl Species {
    /// First flavor text written in `language`, compared case-insensitively.
    pub fn description(&self, language: &str) -> Option<&str> {
        if language.is_empty() {
            return None;
        }

        self.flavor_text_entries
            .iter()
            .find(|entry| entry.language.name.eq_ignore_ascii_case(language))
            .map(|entry| entry.flavor_text.as_str())
    }

    /// Habitat name, empty when unknown.
    pub fn habitat_name(&self) -> &str {
        self.habitat
            .as_ref()
            .map(|habitat| habitat.name.as_str())
            .unwrap_or_default()
    }
}

/// PokéAPI client. Always speaks JSON.
#[derive(Clone, Debug)]
pub struct PokeApiClient {
    client: Client<Json>,
}

impl PokeApiClient {
    pub fn new<E: Encoder>(options: ClientOptions<E>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, options)
    }

    pub fn with_endpoint<E: Encoder>(
        endpoint: impl Into<String>,
        options: ClientOptions<E>,
    ) -> Self {
        let options = options.with_encoder(Json).with_user_agent(USER_AGENT);
        Self {
            client: Client::new(endpoint, options),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Fetches a species by name or id.
    pub async fn species(&self, ctx: &CallContext, reference: &str) -> Result<Species, ApiError> {
        let path = format!("/pokemon-species/{}/", escape_path_segment(reference));
        self.client.call(ctx, Method::GET, &path, &()).await
    }
}
