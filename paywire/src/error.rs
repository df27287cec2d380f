//! Error taxonomy for payment negotiation.
//!
//! Every failure the engine can hit maps to one [`PaymentError`] variant, and
//! every variant has a stable machine-readable [`ErrorKind`].

use serde::Serialize;
use std::fmt;

use crate::chain::{ChainId, NetworkFamily};

/// Base error type for client-side payment operations.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// A required field is missing or not well-formed.
    #[error("Malformed payment requirements: {0}")]
    MalformedRequirements(String),

    /// The server advertised nothing this client understands.
    #[error("No acceptable payment method advertised: {0}")]
    NoAcceptableMethod(String),

    /// The caller's selection policy excludes every candidate.
    #[error("No payment method matches the selection policy: {0}")]
    NoMatchingMethod(String),

    /// Asset precision could not be determined.
    #[error("Cannot resolve decimals for {asset} on {network}: {reason}")]
    AssetResolution {
        /// Network the asset lives on.
        network: ChainId,
        /// Asset contract or mint address.
        asset: String,
        /// Underlying failure.
        reason: String,
    },

    /// No key is configured for the candidate's network family.
    #[error("No signer configured for {0} payments")]
    NoSignerConfigured(NetworkFamily),

    /// Key material is malformed or the signing primitive failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The Solana transfer transaction could not be assembled.
    #[error("Cannot build transaction: {0}")]
    TransactionBuild(String),

    /// Network-level failure, timeout, rate limit or server-side error.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server refused the payment itself.
    #[error("Payment rejected with status {status}: {reason}")]
    RejectedPayment {
        /// HTTP status returned for the paid request.
        status: u16,
        /// Server-provided reason, if any.
        reason: String,
    },

    /// Retries for one candidate ran out.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of submissions made.
        attempts: u32,
        /// Error from the final attempt.
        last: Box<PaymentError>,
    },

    /// Every candidate in the try-list failed.
    #[error("All payment candidates failed; last error: {last}")]
    FallbackExhausted {
        /// Terminal error of the last candidate attempted.
        last: Box<PaymentError>,
    },

    /// The paid response lacks purchase metadata.
    #[error("Cannot parse purchase receipt: {0}")]
    ReceiptParse(String),

    /// A deadline passed or the caller cancelled.
    #[error("Call cancelled")]
    Cancelled,

    /// The unpaid request ended in a definitive, non-payment error.
    #[error("Upstream responded with status {status}")]
    UpstreamStatus {
        /// HTTP status of the response.
        status: u16,
        /// Response body, if it was JSON.
        body: Option<serde_json::Value>,
    },
}

impl PaymentError {
    /// The machine-readable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedRequirements(_) => ErrorKind::MalformedRequirements,
            Self::NoAcceptableMethod(_) => ErrorKind::NoAcceptableMethod,
            Self::NoMatchingMethod(_) => ErrorKind::NoMatchingMethod,
            Self::AssetResolution { .. } => ErrorKind::AssetResolution,
            Self::NoSignerConfigured(_) => ErrorKind::NoSignerConfigured,
            Self::Signing(_) => ErrorKind::Signing,
            Self::TransactionBuild(_) => ErrorKind::TransactionBuild,
            Self::Transport(_) => ErrorKind::Transport,
            Self::RejectedPayment { .. } => ErrorKind::RejectedPayment,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::FallbackExhausted { .. } => ErrorKind::FallbackExhausted,
            Self::ReceiptParse(_) => ErrorKind::ReceiptParse,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::UpstreamStatus { .. } => ErrorKind::UpstreamStatus,
        }
    }

    /// Whether repeating the same step could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Follows `RetryExhausted` / `FallbackExhausted` wrappers to the root error.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::RetryExhausted { last, .. } | Self::FallbackExhausted { last } => {
                last.root_cause()
            }
            other => other,
        }
    }
}

/// Stable, serializable discriminant of [`PaymentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// See [`PaymentError::MalformedRequirements`].
    MalformedRequirements,
    /// See [`PaymentError::NoAcceptableMethod`].
    NoAcceptableMethod,
    /// See [`PaymentError::NoMatchingMethod`].
    NoMatchingMethod,
    /// See [`PaymentError::AssetResolution`].
    AssetResolution,
    /// See [`PaymentError::NoSignerConfigured`].
    NoSignerConfigured,
    /// See [`PaymentError::Signing`].
    Signing,
    /// See [`PaymentError::TransactionBuild`].
    TransactionBuild,
    /// See [`PaymentError::Transport`].
    Transport,
    /// See [`PaymentError::RejectedPayment`].
    RejectedPayment,
    /// See [`PaymentError::RetryExhausted`].
    RetryExhausted,
    /// See [`PaymentError::FallbackExhausted`].
    FallbackExhausted,
    /// See [`PaymentError::ReceiptParse`].
    ReceiptParse,
    /// See [`PaymentError::Cancelled`].
    Cancelled,
    /// See [`PaymentError::UpstreamStatus`].
    UpstreamStatus,
}

impl ErrorKind {
    /// Stable error code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MalformedRequirements => "MALFORMED_REQUIREMENTS",
            Self::NoAcceptableMethod => "NO_ACCEPTABLE_METHOD",
            Self::NoMatchingMethod => "NO_MATCHING_METHOD",
            Self::AssetResolution => "ASSET_RESOLUTION",
            Self::NoSignerConfigured => "NO_SIGNER_CONFIGURED",
            Self::Signing => "SIGNING",
            Self::TransactionBuild => "TRANSACTION_BUILD",
            Self::Transport => "TRANSPORT",
            Self::RejectedPayment => "REJECTED_PAYMENT",
            Self::RetryExhausted => "RETRY_EXHAUSTED",
            Self::FallbackExhausted => "FALLBACK_EXHAUSTED",
            Self::ReceiptParse => "RECEIPT_PARSE",
            Self::Cancelled => "CANCELLED",
            Self::UpstreamStatus => "UPSTREAM_STATUS",
        }
    }

    /// Only transport-level failures are worth repeating.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transport)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
