//! The signing capability and the wallet that routes candidates to it.
//!
//! Each network family has one [`PaymentSigner`] implementation living in its
//! own chain crate. A [`WalletSet`] holds at most one signer per family and
//! picks the right one by the candidate's network tag.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::candidate::PaymentCandidate;
use crate::chain::{ChainId, NetworkFamily};
use crate::encoding::{EncodingError, encode_json};
use crate::error::PaymentError;
use crate::requirements::{EXACT_SCHEME, X402_VERSION};
use crate::timestamp::UnixTimestamp;

/// Boxed, sendable future used by dyn-compatible async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-call information a signer may need beyond the candidate itself.
#[derive(Debug, Clone, Default)]
pub struct SigningContext {
    /// Resource descriptor from the 402 response, echoed into the payload.
    pub resource: Option<Value>,
}

/// A freshly produced payment authorization. Never reused across submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayment {
    /// Network the payment settles on.
    pub network: ChainId,
    /// Payment scheme.
    pub scheme: String,
    /// Scheme-specific payload (signature and authorization, or transaction).
    pub payload: Value,
    /// The requirement entry being satisfied, verbatim.
    pub accepted: Value,
    /// Resource descriptor echoed back to the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
    /// Replay-protection nonce, when the scheme has one.
    #[serde(skip)]
    pub nonce: Option<String>,
    /// End of the authorization window, when the scheme has one.
    #[serde(skip)]
    pub valid_before: Option<UnixTimestamp>,
}

impl SignedPayment {
    /// Starts a payment for `candidate` with the given scheme payload.
    #[must_use]
    pub fn new(candidate: &PaymentCandidate, ctx: &SigningContext, payload: Value) -> Self {
        let resource = ctx.resource.clone().or_else(|| {
            candidate
                .requirement
                .resource
                .as_ref()
                .map(|url| json!({ "url": url }))
        });
        Self {
            network: candidate.requirement.network.clone(),
            scheme: EXACT_SCHEME.to_owned(),
            payload,
            accepted: candidate.requirement.raw.clone(),
            resource,
            nonce: None,
            valid_before: None,
        }
    }

    /// Records the replay-protection nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Records the end of the authorization window.
    #[must_use]
    pub const fn with_valid_before(mut self, valid_before: UnixTimestamp) -> Self {
        self.valid_before = Some(valid_before);
        self
    }

    /// The JSON document carried in the payment header.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut wire = json!({
            "x402Version": X402_VERSION,
            "scheme": self.scheme,
            "network": self.network,
            "accepted": self.accepted,
            "payload": self.payload,
        });
        if let (Some(resource), Some(map)) = (&self.resource, wire.as_object_mut()) {
            map.insert("resource".into(), resource.clone());
        }
        wire
    }

    /// Base64-encoded header value.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the payload cannot be serialized.
    pub fn encode_header(&self) -> Result<String, EncodingError> {
        encode_json(&self.to_wire())
    }
}

/// Produces payment authorizations for one network family.
///
/// Implementations hold their key material privately and must not expose it
/// through `Debug` or serialization.
pub trait PaymentSigner: Send + Sync + fmt::Debug {
    /// The family this signer can pay on.
    fn family(&self) -> NetworkFamily;

    /// Address of the paying wallet, as rendered on its chain.
    fn address(&self) -> String;

    /// Signs a fresh authorization for `candidate`.
    ///
    /// Every call must yield a new nonce or a new transaction, even for the
    /// same candidate.
    fn sign<'a>(
        &'a self,
        candidate: &'a PaymentCandidate,
        ctx: &'a SigningContext,
    ) -> BoxFuture<'a, Result<SignedPayment, PaymentError>>;
}

/// Zero, one or two signers, one per network family.
///
/// Cloning shares the underlying signers.
#[derive(Clone, Default)]
pub struct WalletSet {
    evm: Option<Arc<dyn PaymentSigner>>,
    solana: Option<Arc<dyn PaymentSigner>>,
}

impl fmt::Debug for WalletSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSet")
            .field("evm", &self.evm.as_ref().map(|s| s.address()))
            .field("solana", &self.solana.as_ref().map(|s| s.address()))
            .finish()
    }
}

impl WalletSet {
    /// An empty wallet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `signer` for its family, replacing any previous one.
    #[must_use]
    pub fn with_signer<S: PaymentSigner + 'static>(self, signer: S) -> Self {
        self.with_shared_signer(Arc::new(signer))
    }

    /// Installs an already shared signer for its family.
    #[must_use]
    pub fn with_shared_signer(mut self, signer: Arc<dyn PaymentSigner>) -> Self {
        match signer.family() {
            NetworkFamily::Evm => self.evm = Some(signer),
            NetworkFamily::Solana => self.solana = Some(signer),
        }
        self
    }

    /// The signer for `family`, if configured.
    #[must_use]
    pub fn get(&self, family: NetworkFamily) -> Option<&Arc<dyn PaymentSigner>> {
        match family {
            NetworkFamily::Evm => self.evm.as_ref(),
            NetworkFamily::Solana => self.solana.as_ref(),
        }
    }

    /// The signer for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NoSignerConfigured`] if none is installed.
    pub fn signer_for(&self, family: NetworkFamily) -> Result<&Arc<dyn PaymentSigner>, PaymentError> {
        self.get(family)
            .ok_or(PaymentError::NoSignerConfigured(family))
    }

    /// Families with a configured signer.
    #[must_use]
    pub fn families(&self) -> Vec<NetworkFamily> {
        [NetworkFamily::Evm, NetworkFamily::Solana]
            .into_iter()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }

    /// Whether no signer is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.evm.is_none() && self.solana.is_none()
    }
}

/// A raw secret string, wiped from memory when dropped.
pub type SecretString = Zeroizing<String>;

/// Wraps `raw` so it is wiped on drop, trimming surrounding whitespace.
///
/// Returns `None` for empty input.
#[must_use]
pub fn secret(raw: impl Into<String>) -> Option<SecretString> {
    let raw = Zeroizing::new(raw.into());
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Zeroizing::new(trimmed.to_owned()))
    }
}
