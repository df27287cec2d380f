#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana support for the paywire x402 client.
//!
//! Payments on Solana are SPL token transfers. The client builds a
//! `transferChecked` transaction from its associated token account to the
//! recipient's, signs it as the token owner, and leaves the fee payer's
//! signature to the facilitator that settles it.
//!
//! # Feature Flags
//!
//! - `client` - Transaction building and mint lookups over RPC
//! - `telemetry` - Enables tracing instrumentation

pub mod networks;
pub use networks::*;

#[cfg(feature = "client")]
pub mod decimals;
#[cfg(feature = "client")]
pub mod mint;
#[cfg(feature = "client")]
pub mod rpc;
#[cfg(feature = "client")]
pub mod signer;

#[cfg(feature = "client")]
pub use decimals::SolanaDecimalsSource;
#[cfg(feature = "client")]
pub use rpc::{RpcRoutes, SolanaRpc};
#[cfg(feature = "client")]
pub use signer::SolanaTransferSigner;
