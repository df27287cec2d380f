//! `paywire`: make one HTTP call, paying for it over x402 if asked.
//!
//! # Usage
//!
//! ```bash
//! # Pay for a marketplace link with whichever wallet fits
//! BASE_PRIVATE_KEY=0x... paywire joe/weather
//!
//! # Insist on Solana USDC, POST a JSON body, stop after 20 seconds
//! paywire joe/summarize -X POST --body '{"text":"..."}' \
//!     --network solana --asset USDC --no-fallback --deadline-secs 20
//!
//! # Verbose engine logs
//! RUST_LOG=paywire=debug paywire https://example.com/api/report
//! ```
//!
//! The outcome is printed to stdout as JSON. The exit status is 0 when the
//! resource was served, 1 when the call failed, 2 for setup errors and 130
//! when interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use paywire::CandidateSelector;
use paywire_cli::util::{INTERRUPTED_EXIT_CODE, SigDown};
use paywire_cli::wallets::{decimals_resolver, known_registry, solana_routes, wallet_set};
use paywire_cli::{Cli, CliError};
use paywire_http::PaymentSubmissionEngine;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(2)
        }
    }
}

#[allow(clippy::print_stdout)]
async fn run(mut cli: Cli) -> Result<ExitCode, CliError> {
    let (base_key, solana_key) = cli.take_keys();
    let registry = Arc::new(known_registry());
    let wallets = wallet_set(base_key, solana_key, solana_routes(&cli.solana_rpc_url))?;
    let resolver = decimals_resolver(
        &registry,
        &cli.base_rpc_url,
        solana_routes(&cli.solana_rpc_url),
    )?;
    tracing::info!(wallets = ?wallets.families(), api_base = %cli.api_base, "Configured");

    let config = cli.engine_config();
    let request = cli.call_request(&config)?;
    let sig_down = SigDown::try_new()?;
    let options = cli
        .call_options(&registry)?
        .with_retry(cli.retry_policy())
        .with_cancellation(sig_down.cancellation_token());

    let engine = PaymentSubmissionEngine::new(config, wallets)?
        .with_resolver(Arc::new(resolver))
        .with_selector(CandidateSelector::new(Arc::clone(&registry)))
        .with_retry_policy(cli.retry_policy());

    let outcome = engine.call(request, options).await;
    let interrupted = sig_down.interrupted();
    sig_down.shutdown().await;

    println!("{:#}", outcome.to_json());

    Ok(if interrupted {
        ExitCode::from(INTERRUPTED_EXIT_CODE)
    } else if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
