//! Mint account inspection and associated token account derivation.

use solana_pubkey::{Pubkey, pubkey};
use spl_token::solana_program::program_pack::Pack;

use crate::rpc::{SolanaRpc, SolanaRpcError};

/// Associated Token Account program public key.
pub const ATA_PROGRAM_PUBKEY: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// A token mint and the program that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mint {
    /// Standard SPL Token mint.
    Token {
        /// Number of decimal places.
        decimals: u8,
    },
    /// SPL Token-2022 mint.
    Token2022 {
        /// Number of decimal places.
        decimals: u8,
    },
}

impl Mint {
    /// The token program that owns this mint.
    #[must_use]
    pub fn token_program(&self) -> Pubkey {
        match self {
            Self::Token { .. } => spl_token::id(),
            Self::Token2022 { .. } => spl_token_2022::id(),
        }
    }

    /// The mint's precision.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        match self {
            Self::Token { decimals } | Self::Token2022 { decimals } => *decimals,
        }
    }
}

/// Why a mint could not be read.
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    /// The RPC call failed.
    #[error(transparent)]
    Rpc(#[from] SolanaRpcError),
    /// No account lives at the mint address.
    #[error("Mint account {0} does not exist")]
    NotFound(Pubkey),
    /// The account is not owned by a token program.
    #[error("Account {0} is not owned by a token program")]
    UnknownOwner(Pubkey),
    /// The account data is not a mint.
    #[error("Cannot unpack mint {mint}: {reason}")]
    Unpack {
        /// Mint address.
        mint: Pubkey,
        /// Decoder error.
        reason: String,
    },
}

/// Reads the mint account and determines its program and decimals.
///
/// # Errors
///
/// Returns [`MintError`] if the account is missing, foreign, or corrupt.
pub async fn fetch_mint<R: SolanaRpc + ?Sized>(rpc: &R, mint: &Pubkey) -> Result<Mint, MintError> {
    let account = rpc
        .get_account(mint)
        .await?
        .ok_or(MintError::NotFound(*mint))?;
    if account.owner == spl_token::id() {
        let state = spl_token::state::Mint::unpack(&account.data).map_err(|e| MintError::Unpack {
            mint: *mint,
            reason: e.to_string(),
        })?;
        Ok(Mint::Token {
            decimals: state.decimals,
        })
    } else if account.owner == spl_token_2022::id() {
        // Token-2022 mints may carry extensions past the base layout.
        let base = account
            .data
            .get(..spl_token_2022::state::Mint::LEN)
            .ok_or_else(|| MintError::Unpack {
                mint: *mint,
                reason: "account data too short".into(),
            })?;
        let state =
            spl_token_2022::state::Mint::unpack_from_slice(base).map_err(|e| MintError::Unpack {
                mint: *mint,
                reason: e.to_string(),
            })?;
        Ok(Mint::Token2022 {
            decimals: state.decimals,
        })
    } else {
        Err(MintError::UnknownOwner(*mint))
    }
}

/// Derives the associated token account of `owner` for `mint`.
#[must_use]
pub fn associated_token_address(owner: &Pubkey, token_program: &Pubkey, mint: &Pubkey) -> Pubkey {
    let (address, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    );
    address
}
