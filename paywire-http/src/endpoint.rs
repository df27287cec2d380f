//! Turning a caller-supplied endpoint into a request URL.

use url::Url;

use crate::constants::LINK_PATH_PREFIX;

/// An endpoint that cannot be turned into a URL.
#[derive(Debug, thiserror::Error)]
#[error("Invalid endpoint {endpoint:?}: {source}")]
pub struct EndpointError {
    endpoint: String,
    #[source]
    source: url::ParseError,
}

impl EndpointError {
    /// The endpoint as given.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Resolves `endpoint` against `api_base`.
///
/// - `https://host/path` is used verbatim.
/// - `/api/...` is resolved against `api_base`.
/// - Anything else is a link slug such as `seller/weather` and becomes
///   `/api/link/seller/weather`.
///
/// # Errors
///
/// Returns [`EndpointError`] if `api_base` or the result is not a valid URL.
pub fn normalize_endpoint(api_base: &str, endpoint: &str) -> Result<Url, EndpointError> {
    let endpoint = endpoint.trim();
    let fail = |source| EndpointError {
        endpoint: endpoint.to_owned(),
        source,
    };
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Url::parse(endpoint).map_err(fail);
    }
    let path = if endpoint.starts_with("/api/") {
        endpoint.to_owned()
    } else {
        format!("{LINK_PATH_PREFIX}{}", endpoint.trim_start_matches('/'))
    };
    Url::parse(api_base)
        .and_then(|base| base.join(&path))
        .map_err(fail)
}
