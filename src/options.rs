use std::sync::Arc;
use std::time::Duration;

use crate::auth::Credentials;
use crate::backoff::{Backoff, Constant};
use crate::format::{Encoder, Json};
use crate::log::{Logger, NoopLogger};
use crate::transport::{ReqwestTransport, Transport};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default `Accept-Language` tag.
pub const DEFAULT_LANGUAGE: &str = "en-GB";

/// Configures a [`Client`](crate::Client).
///
/// Options are applied in order by the `with_*` methods and frozen once the
/// value is moved into a client.
///
/// ```no_run
/// use std::time::Duration;
/// use species_gateway::{backoff::Exponential, ClientOptions, TracingLogger};
///
/// let backoff = Exponential::new(Duration::from_millis(100), Duration::from_secs(2))
///     .expect("valid backoff");
/// let options = ClientOptions::default()
///     .with_max_retries(3)
///     .with_backoff(backoff)
///     .with_logger(TracingLogger)
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Clone, Debug)]
pub struct ClientOptions<E = Json> {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) max_retries: u32,
    pub(crate) encoder: E,
    pub(crate) user_agent: String,
    pub(crate) credentials: Option<Arc<dyn Credentials>>,
    pub(crate) backoff: Arc<dyn Backoff>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) language: String,
    pub(crate) timeout: Option<Duration>,
}

impl Default for ClientOptions<Json> {
    fn default() -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::default()),
            max_retries: DEFAULT_MAX_RETRIES,
            encoder: Json,
            user_agent: String::new(),
            credentials: None,
            backoff: Arc::new(Constant::zero()),
            logger: Arc::new(NoopLogger),
            language: DEFAULT_LANGUAGE.to_owned(),
            timeout: None,
        }
    }
}

impl<E: Encoder> ClientOptions<E> {
    /// Replaces the underlying transport. The client still wraps it in a
    /// response cache.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Switches the body encoder, changing the options' encoder type.
    pub fn with_encoder<F: Encoder>(self, encoder: F) -> ClientOptions<F> {
        ClientOptions {
            transport: self.transport,
            max_retries: self.max_retries,
            encoder,
            user_agent: self.user_agent,
            credentials: self.credentials,
            backoff: self.backoff,
            logger: self.logger,
            language: self.language,
            timeout: self.timeout,
        }
    }

    /// An empty user agent omits the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the credential provider; `None` clears it. Accepts the optional
    /// constructors of [`crate::auth`] directly.
    pub fn with_credentials<C>(mut self, credentials: Option<C>) -> Self
    where
        C: Credentials + 'static,
    {
        self.credentials =
            credentials.map(|credentials| Arc::new(credentials) as Arc<dyn Credentials>);
        self
    }

    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Per-request timeout covering every attempt and backoff sleep.
    /// A zero duration disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Body encoder, also used to decode responses.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// `User-Agent` header value; empty skips the header.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `Accept-Language` header value; empty skips the header.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Per-call timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether a credential provider is configured.
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}
