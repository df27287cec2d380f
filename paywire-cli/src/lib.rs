//! Library half of the `paywire` binary.
//!
//! # Modules
//!
//! - [`config`] - Arguments and environment, via `clap`
//! - [`wallets`] - Registry, decimals resolver and wallet set assembly
//! - [`error`] - Setup errors
//! - [`util`] - Signal handling

pub mod config;
pub mod error;
pub mod util;
pub mod wallets;

pub use config::Cli;
pub use error::CliError;
