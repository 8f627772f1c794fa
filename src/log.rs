//! Leveled logging consumed by the client.

use std::fmt;

/// Leveled logger receiving pre-formatted messages.
///
/// Implementations must not block for long; the client calls them inline
/// around every request attempt.
pub trait Logger: fmt::Debug + Send + Sync {
    fn debug(&self, message: fmt::Arguments<'_>);
    fn info(&self, message: fmt::Arguments<'_>);
    fn warn(&self, message: fmt::Arguments<'_>);
    fn error(&self, message: fmt::Arguments<'_>);
}

/// Discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: fmt::Arguments<'_>) {}
    fn info(&self, _message: fmt::Arguments<'_>) {}
    fn warn(&self, _message: fmt::Arguments<'_>) {}
    fn error(&self, _message: fmt::Arguments<'_>) {}
}

/// Forwards messages to `tracing` under the `species_gateway::client` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: fmt::Arguments<'_>) {
        tracing::debug!(target: "species_gateway::client", "{message}");
    }

    fn info(&self, message: fmt::Arguments<'_>) {
        tracing::info!(target: "species_gateway::client", "{message}");
    }

    fn warn(&self, message: fmt::Arguments<'_>) {
        tracing::warn!(target: "species_gateway::client", "{message}");
    }

    fn error(&self, message: fmt::Arguments<'_>) {
        tracing::error!(target: "species_gateway::client", "{message}");
    }
}
