//! Errors raised before the paid call starts.
//!
//! Failures of the call itself are not errors here: they are reported in the
//! printed outcome.

use paywire::networks::PreferenceError;
use paywire_evm::signer::EvmSignerError;
use paywire_http::EndpointError;
use paywire_svm::signer::SolanaSignerError;

/// Setup failures of the `paywire` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A command-line argument could not be interpreted.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// `--body` is not JSON.
    #[error("request body is not JSON: {0}")]
    Body(#[source] serde_json::Error),

    /// The endpoint does not form a URL.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A network or asset preference names nothing known.
    #[error(transparent)]
    Preference(#[from] PreferenceError),

    /// `BASE_PRIVATE_KEY` could not be loaded.
    #[error("BASE_PRIVATE_KEY: {0}")]
    EvmKey(#[from] EvmSignerError),

    /// `SOLANA_PRIVATE_KEY` could not be loaded.
    #[error("SOLANA_PRIVATE_KEY: {0}")]
    SolanaKey(#[from] SolanaSignerError),

    /// An RPC URL is not a URL.
    #[error("invalid RPC URL {url}: {source}")]
    RpcUrl {
        /// The offending value.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// Neither wallet key is configured.
    #[error("no wallet configured: set BASE_PRIVATE_KEY and/or SOLANA_PRIVATE_KEY")]
    NoWallet,

    /// The HTTP client could not be created.
    #[error("cannot build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// Signal handlers could not be installed.
    #[error("cannot install signal handlers: {0}")]
    Signal(#[from] std::io::Error),
}
