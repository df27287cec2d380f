#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Chain-agnostic core of the paywire x402 client.
//!
//! A resource server answers an unpaid request with `402 Payment Required` and
//! a list of acceptable payment methods. This crate turns that list into a
//! ranked try-list of exactly priced candidates; the chain crates sign them and
//! `paywire-http` drives the exchange.
//!
//! # Modules
//!
//! - [`requirements`] - Parsing of advertised payment methods
//! - [`decimals`] - Single-flight cache of asset precision
//! - [`candidate`] - Requirements with exact base-unit amounts
//! - [`selector`] - Preference and fallback ordering
//! - [`signer`] - The signing capability and [`signer::WalletSet`]
//! - [`retry`] - Bounded exponential backoff
//! - [`receipt`] - Purchase metadata from paid responses
//! - [`error`] - The error taxonomy shared by every crate
//! - [`amount`] - Lossless decimal to base-unit conversion
//! - [`chain`] / [`networks`] - CAIP-2 identifiers, known networks and assets
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod amount;
pub mod candidate;
pub mod chain;
pub mod decimals;
pub mod encoding;
pub mod error;
pub mod networks;
pub mod receipt;
pub mod requirements;
pub mod retry;
pub mod selector;
pub mod signer;
pub mod timestamp;

pub use candidate::PaymentCandidate;
pub use chain::{ChainId, NetworkFamily};
pub use decimals::AssetDecimalsResolver;
pub use error::{ErrorKind, PaymentError};
pub use networks::{AssetPreference, NetworkPreference, NetworkRegistry};
pub use receipt::PurchaseReceipt;
pub use requirements::PaymentRequirement;
pub use retry::RetryPolicy;
pub use selector::{CandidateSelector, SelectionPolicy};
pub use signer::{PaymentSigner, SignedPayment, SigningContext, WalletSet};
