//! Engine configuration.

use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use url::Url;

use crate::constants::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS, USER_AGENT};
use crate::endpoint::{EndpointError, normalize_endpoint};

/// Settings shared by every call an engine makes.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL that relative endpoints resolve against.
    pub api_base: String,
    /// Timeout of each individual HTTP request.
    pub request_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Overrides the API base.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the `User-Agent`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolves a caller endpoint against [`Self::api_base`].
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] if either is not a valid URL.
    pub fn endpoint(&self, endpoint: &str) -> Result<Url, EndpointError> {
        normalize_endpoint(&self.api_base, endpoint)
    }

    /// Builds the HTTP client these settings describe.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the TLS backend cannot be initialised.
    pub fn build_client(&self) -> Result<ClientWithMiddleware, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(&self.user_agent)
            .build()?;
        Ok(reqwest_middleware::ClientBuilder::new(client).build())
    }
}
