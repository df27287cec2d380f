//! Command-line and environment configuration.
//!
//! Wallet keys, RPC endpoints and engine limits come from the environment (a
//! `.env` file is loaded first); the call itself is described by arguments.
//!
//! # Environment Variables
//!
//! - `PAYWIRE_API_BASE` - Base URL for slugs and relative paths (default: `https://1ly.store`)
//! - `BASE_PRIVATE_KEY` - Hex secp256k1 key, with or without `0x`
//! - `SOLANA_PRIVATE_KEY` - Base58 keypair or JSON byte array
//! - `BASE_RPC_URL` - Base JSON-RPC endpoint
//! - `SOLANA_RPC_URL` - Solana JSON-RPC endpoint
//! - `PAYWIRE_TIMEOUT_SECS` - Per-request timeout
//! - `PAYWIRE_MAX_ATTEMPTS` - Submissions per payment method
//! - `RUST_LOG` - Log filter (default: `info`)

use clap::Parser;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use paywire::signer::{SecretString, secret};
use paywire::{AssetPreference, NetworkRegistry, RetryPolicy, SelectionPolicy};
use paywire_evm::BASE_MAINNET_RPC;
use paywire_http::constants::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use paywire_http::{CallOptions, CallRequest, EngineConfig};
use paywire_svm::SOLANA_MAINNET_RPC;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::error::CliError;

/// Performs one x402-paid HTTP call and prints the outcome as JSON.
#[derive(Parser)]
#[command(name = "paywire", version, about)]
pub struct Cli {
    /// Link slug (`seller/link`), API path (`/api/...`) or absolute URL.
    pub endpoint: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// JSON request body.
    #[arg(short, long)]
    pub body: Option<String>,

    /// Extra request header as `name:value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Preferred network: `base`, `solana`, another known network name, a CAIP-2 id,
    /// or `evm`/`svm` for any chain of that family.
    #[arg(long)]
    pub network: Option<String>,

    /// Preferred asset: `USDC`, `1LY` or an asset address.
    #[arg(long)]
    pub asset: Option<String>,

    /// Only pay with methods matching the preferences.
    #[arg(long)]
    pub no_fallback: bool,

    /// Give up on the whole call after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Base URL for slugs and relative paths.
    #[arg(long, env = "PAYWIRE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// EVM private key.
    #[arg(long, env = "BASE_PRIVATE_KEY", hide_env_values = true)]
    pub base_private_key: Option<String>,

    /// Solana private key.
    #[arg(long, env = "SOLANA_PRIVATE_KEY", hide_env_values = true)]
    pub solana_private_key: Option<String>,

    /// Base JSON-RPC endpoint.
    #[arg(long, env = "BASE_RPC_URL", default_value = BASE_MAINNET_RPC)]
    pub base_rpc_url: String,

    /// Solana JSON-RPC endpoint.
    #[arg(long, env = "SOLANA_RPC_URL", default_value = SOLANA_MAINNET_RPC)]
    pub solana_rpc_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PAYWIRE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Submissions allowed per payment method.
    #[arg(long, env = "PAYWIRE_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("network", &self.network)
            .field("asset", &self.asset)
            .field("no_fallback", &self.no_fallback)
            .field("api_base", &self.api_base)
            .field("base_key", &self.base_private_key.is_some())
            .field("solana_key", &self.solana_private_key.is_some())
            .finish_non_exhaustive()
    }
}

impl Cli {
    /// Moves the raw key strings out into wiping buffers.
    pub fn take_keys(&mut self) -> (Option<SecretString>, Option<SecretString>) {
        (
            self.base_private_key.take().and_then(secret),
            self.solana_private_key.take().and_then(secret),
        )
    }

    /// Engine-wide settings.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_api_base(self.api_base.clone())
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// Default retry policy, honouring `PAYWIRE_MAX_ATTEMPTS`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::default();
        match self.max_attempts {
            Some(attempts) => policy.with_max_attempts(attempts),
            None => policy,
        }
    }

    /// Selection preferences for this call.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Preference`] for an unrecognised network or an empty asset.
    pub fn selection_policy(&self, registry: &NetworkRegistry) -> Result<SelectionPolicy, CliError> {
        let mut policy = SelectionPolicy::new().allow_fallback(!self.no_fallback);
        if let Some(network) = &self.network {
            policy = policy.prefer_network(registry.network_preference(network)?);
        }
        if let Some(asset) = &self.asset {
            policy = policy.prefer_asset(asset.parse::<AssetPreference>()?);
        }
        Ok(policy)
    }

    /// Per-call options, without cancellation.
    ///
    /// # Errors
    ///
    /// See [`Self::selection_policy`].
    pub fn call_options(&self, registry: &NetworkRegistry) -> Result<CallOptions, CliError> {
        let mut options = CallOptions::new().with_policy(self.selection_policy(registry)?);
        if let Some(secs) = self.deadline_secs {
            options = options.with_deadline(Duration::from_secs(secs));
        }
        Ok(options)
    }

    /// The request described by the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] for a bad endpoint, method, header or body.
    pub fn call_request(&self, config: &EngineConfig) -> Result<CallRequest, CliError> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| CliError::Argument(format!("invalid method: {}", self.method)))?;
        let mut request = CallRequest::new(config.endpoint(&self.endpoint)?)
            .with_method(method)
            .with_headers(parse_headers(&self.headers)?);
        if let Some(body) = &self.body {
            let body: Value = serde_json::from_str(body).map_err(CliError::Body)?;
            request = request.with_json(body);
        }
        Ok(request)
    }
}

/// Parses `name:value` pairs.
fn parse_headers(raw: &[String]) -> Result<HeaderMap, CliError> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .ok_or_else(|| CliError::Argument(format!("header must be name:value, got {entry}")))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| CliError::Argument(format!("invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| CliError::Argument(format!("invalid value for header {name}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}
