//! `species-gateway` is a small HTTP gateway over PokéAPI and the
//! funtranslations API, built on a generic outbound client.
//!
//! The client core lives in [`Client`]:
//! - [`Client::call`] encodes, sends, retries and decodes a single call
//! - [`ClientOptions`] configures transport, retries, backoff, credentials,
//!   encoding, logging and timeouts
//! - every failure is an [`ApiError`] with a stable [`ErrorCode`]
//!
//! [`pokeapi`] and [`translation`] wrap the client for the two upstreams,
//! and [`server`] exposes them over HTTP.

pub mod auth;
pub mod backoff;
pub mod cache;
mod client;
mod context;
mod error;
pub mod format;
mod log;
mod options;
pub mod pokeapi;
mod query;
pub mod server;
pub mod text;
pub mod translation;
mod transport;

pub use client::Client;
pub use context::{CallContext, ContextError};
pub use error::{ApiError, ErrorCode, ErrorKind, REQUEST_ID_HEADER};
pub use log::{Logger, NoopLogger, TracingLogger};
pub use options::{ClientOptions, DEFAULT_LANGUAGE, DEFAULT_MAX_RETRIES};
pub use query::{QueryPairs, QueryParameters};
pub use transport::{HttpResponse, ReqwestTransport, Transport, TransportError};
