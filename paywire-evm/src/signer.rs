//! EIP-3009 `transferWithAuthorization` signing.
//!
//! [`EvmAuthorizationSigner`] signs an EIP-712 typed authorization scoped to
//! the asset contract and chain, so a signature for one (asset, chain) pair is
//! worthless on any other. Every call draws a fresh random nonce.

use alloy_primitives::{Address, B256, Bytes, U256, hex};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain, sol};
use paywire::candidate::PaymentCandidate;
use paywire::chain::{ChainId, NetworkFamily};
use paywire::error::PaymentError;
use paywire::signer::{BoxFuture, PaymentSigner, SignedPayment, SigningContext};
use paywire::timestamp::UnixTimestamp;
use rand::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::networks::{DEFAULT_USDC_NAME, DEFAULT_USDC_VERSION};

/// How far in the past `validAfter` is placed when the server does not set it,
/// absorbing clock skew between client and verifier.
pub const VALID_AFTER_SKEW_SECS: u64 = 600;

/// Authorization lifetime used when the requirement has no `maxTimeoutSeconds`.
pub const DEFAULT_WINDOW_SECS: u64 = 300;

/// Hard cap on authorization lifetime regardless of what the server asks for.
pub const MAX_WINDOW_SECS: u64 = 3600;

sol!(
    /// EIP-712 struct signed for ERC-3009 `transferWithAuthorization`.
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

/// The authorization half of the `exact` EVM payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    /// Paying wallet.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount in base units, as a decimal string.
    pub value: String,
    /// Earliest block time the authorization is usable.
    pub valid_after: UnixTimestamp,
    /// Latest block time the authorization is usable.
    pub valid_before: UnixTimestamp,
    /// Random 32-byte nonce.
    pub nonce: B256,
}

/// Signed `exact` EVM payload as carried in the payment header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    /// 65-byte ECDSA signature over the EIP-712 hash.
    pub signature: Bytes,
    /// The signed authorization.
    pub authorization: ExactEvmAuthorization,
}

/// Everything needed to sign one authorization.
#[derive(Debug, Clone)]
pub struct AuthorizationParams {
    /// Numeric EIP-155 chain ID.
    pub chain_id: u64,
    /// Token contract, the EIP-712 verifying contract.
    pub asset: Address,
    /// Recipient.
    pub pay_to: Address,
    /// Exact amount in base units.
    pub amount: U256,
    /// EIP-712 domain name.
    pub name: String,
    /// EIP-712 domain version.
    pub version: String,
    /// Requested authorization lifetime.
    pub max_timeout_seconds: Option<u64>,
    /// Server-imposed start of the window.
    pub valid_after: Option<UnixTimestamp>,
    /// Server-imposed end of the window.
    pub valid_before: Option<UnixTimestamp>,
}

impl AuthorizationParams {
    /// Extracts signing parameters from a resolved candidate.
    ///
    /// The EIP-712 domain name and version come from the requirement's
    /// `extra`, defaulting to the USDC values.
    ///
    /// # Errors
    ///
    /// Returns [`EvmSignerError`] if the network is not EVM or an address is
    /// not valid hex.
    pub fn from_candidate(candidate: &PaymentCandidate) -> Result<Self, EvmSignerError> {
        let requirement = &candidate.requirement;
        let chain_id = requirement
            .network
            .evm_chain_id()
            .ok_or_else(|| EvmSignerError::UnsupportedNetwork(requirement.network.clone()))?;
        let extra = &requirement.extra;
        Ok(Self {
            chain_id,
            asset: parse_address(&requirement.asset, "asset")?,
            pay_to: parse_address(&requirement.pay_to, "payTo")?,
            amount: U256::from(candidate.base_units),
            name: extra
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_USDC_NAME.to_owned()),
            version: extra
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_USDC_VERSION.to_owned()),
            max_timeout_seconds: requirement.max_timeout_seconds,
            valid_after: requirement.valid_after,
            valid_before: requirement.valid_before,
        })
    }

    /// The EIP-712 domain these parameters sign under.
    #[must_use]
    pub fn domain(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.asset,
        }
    }
}

/// Errors from EVM authorization signing.
#[derive(Debug, thiserror::Error)]
pub enum EvmSignerError {
    /// The private key is not 32 bytes of hex.
    #[error("Invalid EVM private key: {0}")]
    InvalidKey(String),
    /// The candidate is not on an EIP-155 chain.
    #[error("Not an EVM network: {0}")]
    UnsupportedNetwork(ChainId),
    /// An address in the requirement is not valid hex.
    #[error("Invalid {field} address: {value}")]
    InvalidAddress {
        /// Requirement field.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// The server-imposed window has already closed.
    #[error("Authorization window closed at {0}")]
    WindowExpired(UnixTimestamp),
    /// `validAfter` does not precede the effective `validBefore`.
    #[error("Authorization window is empty: valid after {valid_after}, valid before {valid_before}")]
    EmptyWindow {
        /// Start of the window.
        valid_after: UnixTimestamp,
        /// End of the window after capping.
        valid_before: UnixTimestamp,
    },
    /// The signing primitive failed.
    #[error("Signer error: {0}")]
    Sign(#[from] alloy_signer::Error),
}

impl From<EvmSignerError> for PaymentError {
    fn from(e: EvmSignerError) -> Self {
        Self::Signing(e.to_string())
    }
}

fn parse_address(value: &str, field: &'static str) -> Result<Address, EvmSignerError> {
    Address::from_str(value).map_err(|_| EvmSignerError::InvalidAddress {
        field,
        value: value.to_owned(),
    })
}

/// Signs EIP-3009 authorizations with an in-memory secp256k1 key.
///
/// The key never leaves this struct. `Debug` prints only the address.
pub struct EvmAuthorizationSigner {
    signer: PrivateKeySigner,
    default_window: u64,
    max_window: u64,
}

impl fmt::Debug for EvmAuthorizationSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmAuthorizationSigner")
            .field("address", &self.signer.address())
            .field("default_window", &self.default_window)
            .field("max_window", &self.max_window)
            .finish_non_exhaustive()
    }
}

impl EvmAuthorizationSigner {
    /// Wraps an existing alloy signer.
    #[must_use]
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self {
            signer,
            default_window: DEFAULT_WINDOW_SECS,
            max_window: MAX_WINDOW_SECS,
        }
    }

    /// Parses a hex private key, with or without a `0x` prefix.
    ///
    /// The decoded key bytes are wiped once the signer is built.
    ///
    /// # Errors
    ///
    /// Returns [`EvmSignerError::InvalidKey`] if the key is not 32 bytes of hex.
    pub fn from_private_key(raw: &str) -> Result<Self, EvmSignerError> {
        let trimmed = raw.trim();
        let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(hex_str).map_err(|_| EvmSignerError::InvalidKey("not hex".into()))?,
        );
        if bytes.len() != 32 {
            return Err(EvmSignerError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let signer = PrivateKeySigner::from_slice(&bytes)
            .map_err(|e| EvmSignerError::InvalidKey(e.to_string()))?;
        Ok(Self::new(signer))
    }

    /// Overrides the default and maximum authorization lifetimes.
    #[must_use]
    pub const fn with_window(mut self, default_secs: u64, max_secs: u64) -> Self {
        self.default_window = default_secs;
        self.max_window = max_secs;
        self
    }

    /// The paying wallet address.
    #[must_use]
    pub fn wallet_address(&self) -> Address {
        self.signer.address()
    }

    /// Computes `(validAfter, validBefore)` for a signature made at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`EvmSignerError::WindowExpired`] if the server's `validBefore`
    /// is not in the future, or [`EvmSignerError::EmptyWindow`] if
    /// `validAfter` is not before the capped `validBefore`.
    pub fn window(
        &self,
        params: &AuthorizationParams,
        now: UnixTimestamp,
    ) -> Result<(UnixTimestamp, UnixTimestamp), EvmSignerError> {
        let cap = now + self.max_window;
        let lifetime = params
            .max_timeout_seconds
            .unwrap_or(self.default_window)
            .min(self.max_window);
        let valid_before = params
            .valid_before
            .map_or(now + lifetime, |server| server.min(cap));
        if valid_before <= now {
            return Err(EvmSignerError::WindowExpired(valid_before));
        }
        let valid_after = params
            .valid_after
            .unwrap_or_else(|| now.saturating_sub(VALID_AFTER_SKEW_SECS));
        if valid_after >= valid_before {
            return Err(EvmSignerError::EmptyWindow {
                valid_after,
                valid_before,
            });
        }
        Ok((valid_after, valid_before))
    }

    /// Signs a fresh authorization.
    ///
    /// # Errors
    ///
    /// Returns [`EvmSignerError`] if the window is closed or signing fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "paywire.evm.authorize", skip_all, fields(chain_id = params.chain_id), err)
    )]
    pub async fn authorize(
        &self,
        params: &AuthorizationParams,
    ) -> Result<ExactEvmPayload, EvmSignerError> {
        let (valid_after, valid_before) = self.window(params, UnixTimestamp::now())?;
        let nonce = B256::from(rng().random::<[u8; 32]>());

        let transfer = TransferWithAuthorization {
            from: self.signer.address(),
            to: params.pay_to,
            value: params.amount,
            validAfter: U256::from(valid_after.as_secs()),
            validBefore: U256::from(valid_before.as_secs()),
            nonce,
        };
        let hash = transfer.eip712_signing_hash(&params.domain());
        let signature = self.signer.sign_hash(&hash).await?;

        #[cfg(feature = "telemetry")]
        debug!(
            valid_before = valid_before.as_secs(),
            "Signed transfer authorization"
        );

        Ok(ExactEvmPayload {
            signature: signature.as_bytes().into(),
            authorization: ExactEvmAuthorization {
                from: transfer.from,
                to: transfer.to,
                value: params.amount.to_string(),
                valid_after,
                valid_before,
                nonce,
            },
        })
    }
}

impl PaymentSigner for EvmAuthorizationSigner {
    fn family(&self) -> NetworkFamily {
        NetworkFamily::Evm
    }

    fn address(&self) -> String {
        self.signer.address().to_checksum(None)
    }

    fn sign<'a>(
        &'a self,
        candidate: &'a PaymentCandidate,
        ctx: &'a SigningContext,
    ) -> BoxFuture<'a, Result<SignedPayment, PaymentError>> {
        Box::pin(async move {
            let params = AuthorizationParams::from_candidate(candidate)?;
            let payload = self.authorize(&params).await?;
            let nonce = payload.authorization.nonce.to_string();
            let valid_before = payload.authorization.valid_before;
            let value = serde_json::to_value(&payload)
                .map_err(|e| PaymentError::Signing(e.to_string()))?;
            Ok(SignedPayment::new(candidate, ctx, value)
                .with_nonce(nonce)
                .with_valid_before(valid_before))
        })
    }
}
