//! Inbound HTTP surface: species lookups with optional translations.

mod error;
mod middleware;
mod pokemon;
mod respond;

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::pokeapi::PokeApiClient;
use crate::translation::TranslationClient;

pub use error::HandlerError;
pub use middleware::RequestId;
pub use pokemon::SpeciesResponse;
pub use respond::Responder;

/// Shared state for every route.
#[derive(Clone, Debug)]
pub struct AppState {
    pub pokeapi: Arc<PokeApiClient>,
    pub translation: Arc<TranslationClient>,
    pub responder: Arc<Responder>,
}

impl AppState {
    pub fn new(pokeapi: PokeApiClient, translation: TranslationClient) -> Self {
        Self {
            pokeapi: Arc::new(pokeapi),
            translation: Arc::new(translation),
            responder: Arc::new(Responder::default()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pokemon/:name", get(pokemon::get_species))
        .route("/pokemon/:name/translated", get(pokemon::get_translated))
        .route("/status", get(status))
        .layer(from_fn(middleware::access_log))
        .layer(from_fn(middleware::request_id))
        .with_state(state)
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn status() -> StatusCode {
    StatusCode::OK
}
