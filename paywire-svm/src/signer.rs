//! Partially signed SPL `transferChecked` transactions.
//!
//! The facilitator named in `extra.feePayer` pays the network fee and adds
//! its signature on settlement, so the transaction built here carries only
//! the payer's signature. The fee payer's slot is left as the default
//! (all-zero) signature.
//!
//! Instruction layout is fixed: compute unit limit, compute unit price, then
//! a single `transferChecked` from the payer's associated token account to
//! the recipient's.

use paywire::candidate::PaymentCandidate;
use paywire::chain::{ChainId, NetworkFamily};
use paywire::encoding::Base64Bytes;
use paywire::error::PaymentError;
use paywire::signer::{BoxFuture, PaymentSigner, SignedPayment, SigningContext};
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_keypair::Keypair;
use solana_message::VersionedMessage;
use solana_message::v0::Message as MessageV0;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::mint::{Mint, MintError, associated_token_address, fetch_mint};
use crate::rpc::{RpcRoutes, SolanaRpc};

/// Compute unit limit for a single `transferChecked`.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 8_000;

/// Compute unit price in micro-lamports.
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 1;

/// Errors from Solana transaction signing.
#[derive(Debug, thiserror::Error)]
pub enum SolanaSignerError {
    /// The secret key is neither base58 nor a JSON byte array.
    #[error("Invalid Solana secret key: {0}")]
    InvalidKey(String),
    /// The candidate is not on a Solana cluster.
    #[error("Not a Solana network: {0}")]
    UnsupportedNetwork(ChainId),
    /// No RPC endpoint is configured for the cluster.
    #[error("No RPC endpoint configured for {0}")]
    NoRpc(ChainId),
    /// The requirement does not name a fee payer.
    #[error("Requirement has no extra.feePayer")]
    MissingFeePayer,
    /// A public key in the requirement does not parse.
    #[error("Invalid {field} public key: {value}")]
    InvalidPubkey {
        /// Requirement field.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// The mint could not be read.
    #[error(transparent)]
    Mint(#[from] MintError),
    /// The payer holds no token account for the mint.
    #[error("Payer has no token account {0} for this mint")]
    NoSourceAccount(Pubkey),
    /// The amount was priced at a precision the mint does not have.
    #[error("Mint has {mint} decimals but the amount was priced at {priced}")]
    DecimalsMismatch {
        /// Decimals stored in the mint account.
        mint: u8,
        /// Decimals the base-unit amount was computed with.
        priced: u8,
    },
    /// The amount does not fit the token program's `u64`.
    #[error("Amount {0} exceeds u64")]
    AmountOverflow(u128),
    /// Recent blockhash or account lookup failed.
    #[error("RPC failure: {0}")]
    Rpc(String),
    /// The message could not be compiled.
    #[error("Cannot compile message: {0}")]
    Compile(String),
    /// The keypair refused to sign.
    #[error("Signer error: {0}")]
    Sign(String),
}

impl From<SolanaSignerError> for PaymentError {
    fn from(e: SolanaSignerError) -> Self {
        match e {
            SolanaSignerError::InvalidKey(_) | SolanaSignerError::Sign(_) => {
                Self::Signing(e.to_string())
            }
            _ => Self::TransactionBuild(e.to_string()),
        }
    }
}

/// The accounts a transfer touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferAccounts {
    /// Facilitator paying the network fee.
    pub fee_payer: Pubkey,
    /// Token mint.
    pub mint: Pubkey,
    /// Payer's associated token account.
    pub source: Pubkey,
    /// Recipient's associated token account.
    pub destination: Pubkey,
}

/// Signs SPL token transfers with an in-memory ed25519 keypair.
pub struct SolanaTransferSigner {
    keypair: Keypair,
    routes: RpcRoutes,
    compute_unit_limit: u32,
    compute_unit_price: u64,
}

impl fmt::Debug for SolanaTransferSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaTransferSigner")
            .field("address", &self.keypair.pubkey())
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl SolanaTransferSigner {
    /// Wraps a keypair, querying clusters through `routes`.
    #[must_use]
    pub const fn new(keypair: Keypair, routes: RpcRoutes) -> Self {
        Self {
            keypair,
            routes,
            compute_unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            compute_unit_price: DEFAULT_COMPUTE_UNIT_PRICE,
        }
    }

    /// Parses a secret key as base58 or as a JSON array of bytes.
    ///
    /// Both the 64-byte keypair form and a bare 32-byte secret are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SolanaSignerError::InvalidKey`] for anything else.
    pub fn from_private_key(raw: &str, routes: RpcRoutes) -> Result<Self, SolanaSignerError> {
        let trimmed = raw.trim();
        let bytes = Zeroizing::new(if trimmed.starts_with('[') {
            serde_json::from_str::<Vec<u8>>(trimmed)
                .map_err(|_| SolanaSignerError::InvalidKey("malformed JSON byte array".into()))?
        } else {
            bs58::decode(trimmed)
                .into_vec()
                .map_err(|_| SolanaSignerError::InvalidKey("not base58".into()))?
        });
        let keypair = match bytes.len() {
            64 => Keypair::try_from(bytes.as_slice())
                .map_err(|e| SolanaSignerError::InvalidKey(e.to_string()))?,
            32 => {
                let mut secret = Zeroizing::new([0u8; 32]);
                secret.copy_from_slice(&bytes);
                Keypair::new_from_array(*secret)
            }
            n => {
                return Err(SolanaSignerError::InvalidKey(format!(
                    "expected 32 or 64 bytes, got {n}"
                )));
            }
        };
        Ok(Self::new(keypair, routes))
    }

    /// Overrides the compute budget.
    #[must_use]
    pub const fn with_compute_budget(mut self, limit: u32, micro_lamports: u64) -> Self {
        self.compute_unit_limit = limit;
        self.compute_unit_price = micro_lamports;
        self
    }

    /// The paying wallet.
    #[must_use]
    pub fn wallet_address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Resolves the mint and both token accounts for `candidate`.
    ///
    /// # Errors
    ///
    /// Returns [`SolanaSignerError`] if a key is malformed, the mint cannot be
    /// read, or the payer holds no token account for it.
    pub async fn resolve_accounts<R: SolanaRpc + ?Sized>(
        &self,
        rpc: &R,
        candidate: &PaymentCandidate,
    ) -> Result<(TransferAccounts, Mint), SolanaSignerError> {
        let requirement = &candidate.requirement;
        let fee_payer = requirement
            .extra
            .fee_payer
            .as_deref()
            .ok_or(SolanaSignerError::MissingFeePayer)?;
        let fee_payer = parse_pubkey(fee_payer, "feePayer")?;
        let mint_address = parse_pubkey(&requirement.asset, "asset")?;
        let pay_to = parse_pubkey(&requirement.pay_to, "payTo")?;

        let mint = fetch_mint(rpc, &mint_address).await?;
        let token_program = mint.token_program();
        let source =
            associated_token_address(&self.keypair.pubkey(), &token_program, &mint_address);
        let destination = associated_token_address(&pay_to, &token_program, &mint_address);

        let funded = rpc
            .get_account(&source)
            .await
            .map_err(|e| SolanaSignerError::Rpc(e.to_string()))?;
        if funded.is_none() {
            return Err(SolanaSignerError::NoSourceAccount(source));
        }

        Ok((
            TransferAccounts {
                fee_payer,
                mint: mint_address,
                source,
                destination,
            },
            mint,
        ))
    }

    /// Builds and partially signs a transfer of `amount` base units.
    ///
    /// # Errors
    ///
    /// Returns [`SolanaSignerError`] if the transaction cannot be built or
    /// signed.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "paywire.svm.build_transfer", skip_all, err)
    )]
    pub async fn build_transfer<R: SolanaRpc + ?Sized>(
        &self,
        rpc: &R,
        accounts: &TransferAccounts,
        mint: Mint,
        amount: u64,
    ) -> Result<VersionedTransaction, SolanaSignerError> {
        let payer = self.keypair.pubkey();
        let transfer = match mint {
            Mint::Token { decimals } => spl_token::instruction::transfer_checked(
                &spl_token::id(),
                &accounts.source,
                &accounts.mint,
                &accounts.destination,
                &payer,
                &[],
                amount,
                decimals,
            ),
            Mint::Token2022 { decimals } => spl_token_2022::instruction::transfer_checked(
                &spl_token_2022::id(),
                &accounts.source,
                &accounts.mint,
                &accounts.destination,
                &payer,
                &[],
                amount,
                decimals,
            ),
        }
        .map_err(|e| SolanaSignerError::Compile(e.to_string()))?;

        let instructions = [
            ComputeBudgetInstruction::set_compute_unit_limit(self.compute_unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(self.compute_unit_price),
            transfer,
        ];
        let blockhash = rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| SolanaSignerError::Rpc(e.to_string()))?;
        let message = MessageV0::try_compile(&accounts.fee_payer, &instructions, &[], blockhash)
            .map_err(|e| SolanaSignerError::Compile(format!("{e:?}")))?;
        let message = VersionedMessage::V0(message);

        let num_required = usize::from(message.header().num_required_signatures);
        let position = message
            .static_account_keys()
            .iter()
            .take(num_required)
            .position(|key| *key == payer)
            .ok_or_else(|| SolanaSignerError::Sign("payer is not a required signer".into()))?;
        let signature = self
            .keypair
            .try_sign_message(&message.serialize())
            .map_err(|e| SolanaSignerError::Sign(e.to_string()))?;

        let mut signatures = vec![Signature::default(); num_required];
        signatures[position] = signature;

        #[cfg(feature = "telemetry")]
        debug!(%blockhash, %signature, "Signed transfer transaction");

        Ok(VersionedTransaction {
            signatures,
            message,
        })
    }

    async fn sign_candidate(
        &self,
        candidate: &PaymentCandidate,
        ctx: &SigningContext,
    ) -> Result<SignedPayment, SolanaSignerError> {
        let network = &candidate.requirement.network;
        if network.family() != Some(NetworkFamily::Solana) {
            return Err(SolanaSignerError::UnsupportedNetwork(network.clone()));
        }
        let rpc = self
            .routes
            .get(network)
            .ok_or_else(|| SolanaSignerError::NoRpc(network.clone()))?;
        let amount = u64::try_from(candidate.base_units)
            .map_err(|_| SolanaSignerError::AmountOverflow(candidate.base_units))?;

        let (accounts, mint) = self.resolve_accounts(rpc.as_ref(), candidate).await?;
        if mint.decimals() != candidate.decimals {
            return Err(SolanaSignerError::DecimalsMismatch {
                mint: mint.decimals(),
                priced: candidate.decimals,
            });
        }
        let transaction = self
            .build_transfer(rpc.as_ref(), &accounts, mint, amount)
            .await?;
        let encoded = encode_transaction(&transaction)?;
        let nonce = transaction
            .signatures
            .iter()
            .find(|s| **s != Signature::default())
            .map(ToString::to_string)
            .unwrap_or_default();
        Ok(
            SignedPayment::new(candidate, ctx, serde_json::json!({ "transaction": encoded }))
                .with_nonce(nonce),
        )
    }
}

impl PaymentSigner for SolanaTransferSigner {
    fn family(&self) -> NetworkFamily {
        NetworkFamily::Solana
    }

    fn address(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    fn sign<'a>(
        &'a self,
        candidate: &'a PaymentCandidate,
        ctx: &'a SigningContext,
    ) -> BoxFuture<'a, Result<SignedPayment, PaymentError>> {
        Box::pin(async move { Ok(self.sign_candidate(candidate, ctx).await?) })
    }
}

/// Serializes a transaction with bincode and encodes it as base64.
///
/// # Errors
///
/// Returns [`SolanaSignerError::Compile`] if serialization fails.
pub fn encode_transaction(transaction: &VersionedTransaction) -> Result<String, SolanaSignerError> {
    let bytes =
        bincode::serialize(transaction).map_err(|e| SolanaSignerError::Compile(e.to_string()))?;
    Ok(Base64Bytes::encode(bytes).to_string())
}

fn parse_pubkey(value: &str, field: &'static str) -> Result<Pubkey, SolanaSignerError> {
    Pubkey::from_str(value).map_err(|_| SolanaSignerError::InvalidPubkey {
        field,
        value: value.to_owned(),
    })
}
