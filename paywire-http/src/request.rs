//! Per-call inputs.

use http::{HeaderMap, Method};
use paywire::{RetryPolicy, SelectionPolicy};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// The request to make, paid or not.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// Target URL.
    pub url: Url,
    /// HTTP method.
    pub method: Method,
    /// Extra request headers.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl CallRequest {
    /// A `GET` to `url`.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Sets the method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds headers, replacing any with the same name.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// How one call may pay.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Network and asset preferences.
    pub policy: SelectionPolicy,
    /// Overrides the engine's retry policy for this call.
    pub retry: Option<RetryPolicy>,
    /// Time budget for the whole call, measured from its start.
    pub deadline: Option<Duration>,
    /// Aborts the call when cancelled.
    pub cancel: CancellationToken,
}

impl CallOptions {
    /// Default options: no preference, fallback allowed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selection policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Bounds the whole call.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Ties the call to `cancel`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
