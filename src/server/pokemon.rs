use axum::extract::{Path, State};
use axum::response::Response;
use axum::Extension;
use serde::{Deserialize, Serialize};

use super::error::HandlerError;
use super::middleware::RequestId;
use super::AppState;
use crate::context::CallContext;
use crate::pokeapi::Species;
use crate::text::normalise;
use crate::translation::TranslationMethod;

const DESCRIPTION_LANGUAGE: &str = "en";

/// Species summary returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesResponse {
    pub name: String,
    pub description: String,
    pub habitat: String,
    pub is_legendary: bool,
}

impl From<&Species> for SpeciesResponse {
    fn from(species: &Species) -> Self {
        Self {
            name: species.name.clone(),
            description: normalise(species.description(DESCRIPTION_LANGUAGE).unwrap_or_default()),
            habitat: species.habitat_name().to_owned(),
            is_legendary: species.is_legendary,
        }
    }
}

impl SpeciesResponse {
    /// Yoda for cave dwellers and legendary species, Shakespeare otherwise.
    pub fn translation_method(&self) -> TranslationMethod {
        if self.habitat == "cave" || self.is_legendary {
            TranslationMethod::Yoda
        } else {
            TranslationMethod::Shakespeare
        }
    }
}

/// `GET /pokemon/:name`
pub async fn get_species(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(name): Path<String>,
) -> Response {
    let ctx = CallContext::new();
    match lookup(&state, &ctx, &name).await {
        Ok(species) => state.responder.respond_ok(&request_id, &species),
        Err(err) => fail(&state, &request_id, &err),
    }
}

/// `GET /pokemon/:name/translated`
pub async fn get_translated(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(name): Path<String>,
) -> Response {
    let ctx = CallContext::new();
    let mut species = match lookup(&state, &ctx, &name).await {
        Ok(species) => species,
        Err(err) => return fail(&state, &request_id, &err),
    };

    let method = species.translation_method();
    match state
        .translation
        .translate(&ctx, &species.description, method)
        .await
    {
        Ok(translated) => species.description = translated,
        Err(err) => tracing::warn!(
            request_id = %request_id,
            %method,
            error = %err,
            "translation failed, keeping original description"
        ),
    }

    state.responder.respond_ok(&request_id, &species)
}

async fn lookup(
    state: &AppState,
    ctx: &CallContext,
    name: &str,
) -> Result<SpeciesResponse, HandlerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HandlerError::InvalidRequest(
            "pokemon name is required".to_owned(),
        ));
    }

    let species = state.pokeapi.species(ctx, name).await?;
    Ok(SpeciesResponse::from(&species))
}

fn fail(state: &AppState, request_id: &str, err: &HandlerError) -> Response {
    tracing::error!(request_id = %request_id, error = %err, "request failed");
    state.responder.respond_error(request_id, err)
}

#[cfg(test)]
mod tests {
    use super::SpeciesResponse;
    use crate::pokeapi::{FlavorText, NamedApiResource, Species};
    use crate::translation::TranslationMethod;

    fn species(habitat: Option<&str>, is_legendary: bool) -> Species {
        Species {
            name: "mewtwo".to_owned(),
            is_legendary,
            habitat: habitat.map(|name| NamedApiResource {
                name: name.to_owned(),
            }),
            flavor_text_entries: vec![FlavorText {
                flavor_text: "It was created by\na scientist.".to_owned(),
                language: NamedApiResource {
                    name: "en".to_owned(),
                },
            }],
        }
    }

    #[test]
    fn response_normalises_english_description() {
        let response = SpeciesResponse::from(&species(Some("rare"), true));
        assert_eq!(response.name, "mewtwo");
        assert_eq!(response.description, "It was created by a scientist.");
        assert_eq!(response.habitat, "rare");
        assert!(response.is_legendary);
    }

    #[test]
    fn missing_habitat_and_description_are_empty() {
        let mut bare = species(None, false);
        bare.flavor_text_entries.clear();
        let response = SpeciesResponse::from(&bare);
        assert_eq!(response.habitat, "");
        assert_eq!(response.description, "");
    }

    #[test]
    fn translation_method_follows_habitat_and_rarity() {
        let cases = [
            (Some("cave"), false, TranslationMethod::Yoda),
            (Some("rare"), true, TranslationMethod::Yoda),
            (None, true, TranslationMethod::Yoda),
            (Some("forest"), false, TranslationMethod::Shakespeare),
            (None, false, TranslationMethod::Shakespeare),
        ];
        for (habitat, legendary, expected) in cases {
            let response = SpeciesResponse::from(&species(habitat, legendary));
            assert_eq!(response.translation_method(), expected, "{habitat:?} {legendary}");
        }
    }
}
