#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EIP-155 (EVM) support for the paywire x402 client.
//!
//! Payments on EVM chains use the `exact` scheme backed by ERC-3009
//! `transferWithAuthorization`: the payer signs an EIP-712 typed authorization
//! and the facilitator submits it on-chain, paying gas.
//!
//! # Modules
//!
//! - [`signer`] - [`EvmAuthorizationSigner`], the EVM [`paywire::PaymentSigner`]
//! - [`decimals`] - ERC-20 `decimals()` lookup for the shared resolver
//! - networks - Base and Base Sepolia, with their USDC deployments
//!
//! # Feature Flags
//!
//! - `client` - Signing and RPC lookups
//! - `telemetry` - Tracing instrumentation

mod networks;
pub use networks::*;

#[cfg(feature = "client")]
pub mod decimals;
#[cfg(feature = "client")]
pub mod signer;

#[cfg(feature = "client")]
pub use decimals::EvmDecimalsSource;
#[cfg(feature = "client")]
pub use signer::EvmAuthorizationSigner;
