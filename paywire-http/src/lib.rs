#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP driver for paywire.
//!
//! [`PaymentSubmissionEngine`] sends a request, and when the server answers
//! `402 Payment Required` it negotiates, signs and resubmits until the call is
//! paid or every acceptable method has been tried.
//!
//! ```no_run
//! # async fn run(wallets: paywire::WalletSet) -> Result<(), Box<dyn std::error::Error>> {
//! use paywire_http::{CallOptions, EngineConfig, PaymentSubmissionEngine};
//!
//! let engine = PaymentSubmissionEngine::new(EngineConfig::default(), wallets)?;
//! let outcome = engine
//!     .call(engine.request("joe/weather")?, CallOptions::new())
//!     .await;
//! println!("{:?}", outcome.state);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`engine`] - The state machine
//! - [`request`] - What to call and how hard to try
//! - [`outcome`] - Terminal results and the transition trace
//! - [`headers`] - x402 header encoding
//! - [`endpoint`] - Slug and path resolution against the API base
//! - [`config`] - Engine-wide settings
//! - [`constants`] - Header names and defaults
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod config;
pub mod constants;
pub mod endpoint;
pub mod engine;
pub mod headers;
pub mod outcome;
pub mod request;

pub use config::EngineConfig;
pub use endpoint::{EndpointError, normalize_endpoint};
pub use engine::PaymentSubmissionEngine;
pub use outcome::{CallOutcome, CallSuccess, EngineState, PaidResponse, PaymentFailure};
pub use request::{CallOptions, CallRequest};
