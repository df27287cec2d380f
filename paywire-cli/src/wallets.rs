//! Assembles the registry, decimals resolver and wallet set from configuration.

use paywire::chain::{ChainId, EIP155_NAMESPACE, NetworkFamily, SOLANA_NAMESPACE};
use paywire::signer::SecretString;
use paywire::{AssetDecimalsResolver, NetworkRegistry, WalletSet};
use paywire_evm::{
    BASE_MAINNET, BASE_SEPOLIA, BASE_SEPOLIA_RPC, EvmAuthorizationSigner, EvmDecimalsSource,
};
use paywire_svm::{
    RpcRoutes, SOLANA_DEVNET, SOLANA_DEVNET_RPC, SOLANA_MAINNET, SolanaDecimalsSource,
    SolanaTransferSigner,
};
#[cfg(feature = "telemetry")]
use tracing::info;

use crate::error::CliError;

/// Every network and USDC deployment the binary knows by name.
#[must_use]
pub fn known_registry() -> NetworkRegistry {
    NetworkRegistry::from_networks(paywire_evm::EVM_NETWORKS)
        .with_networks(paywire_svm::SOLANA_NETWORKS)
        .with_assets(paywire_evm::EVM_ASSETS)
        .with_assets(paywire_svm::SOLANA_ASSETS)
}

/// Solana RPC routes: the configured endpoint for mainnet, the public one for devnet.
#[must_use]
pub fn solana_routes(mainnet_rpc: &str) -> RpcRoutes {
    RpcRoutes::new()
        .with_url(ChainId::new(SOLANA_NAMESPACE, SOLANA_MAINNET), mainnet_rpc)
        .with_url(ChainId::new(SOLANA_NAMESPACE, SOLANA_DEVNET), SOLANA_DEVNET_RPC)
}

/// A resolver seeded with known assets that falls back to on-chain lookups.
///
/// # Errors
///
/// Returns [`CliError::RpcUrl`] if an EVM RPC URL is invalid.
pub fn decimals_resolver(
    registry: &NetworkRegistry,
    base_rpc: &str,
    solana: RpcRoutes,
) -> Result<AssetDecimalsResolver, CliError> {
    let evm = EvmDecimalsSource::new()
        .with_rpc_url(
            ChainId::new(EIP155_NAMESPACE, BASE_MAINNET.to_string()),
            base_rpc,
        )
        .map_err(rpc_url_error(base_rpc))?
        .with_rpc_url(
            ChainId::new(EIP155_NAMESPACE, BASE_SEPOLIA.to_string()),
            BASE_SEPOLIA_RPC,
        )
        .map_err(rpc_url_error(BASE_SEPOLIA_RPC))?;
    Ok(AssetDecimalsResolver::new()
        .with_source(NetworkFamily::Evm, evm)
        .with_source(NetworkFamily::Solana, SolanaDecimalsSource::new(solana))
        .with_known_assets(registry))
}

fn rpc_url_error(url: &str) -> impl FnOnce(url::ParseError) -> CliError {
    let url = url.to_owned();
    move |source| CliError::RpcUrl { url, source }
}

/// Parses whichever keys are present into signers.
///
/// The raw strings are wiped when this returns, on success or failure.
///
/// # Errors
///
/// Returns [`CliError::NoWallet`] if neither key is set, or the key error of
/// the first key that fails to parse.
pub fn wallet_set(
    base_key: Option<SecretString>,
    solana_key: Option<SecretString>,
    solana: RpcRoutes,
) -> Result<WalletSet, CliError> {
    let mut wallets = WalletSet::new();
    if let Some(key) = base_key {
        let signer = EvmAuthorizationSigner::from_private_key(&key)?;
        #[cfg(feature = "telemetry")]
        info!(address = %signer.wallet_address(), "Loaded EVM wallet");
        wallets = wallets.with_signer(signer);
    }
    if let Some(key) = solana_key {
        let signer = SolanaTransferSigner::from_private_key(&key, solana)?;
        #[cfg(feature = "telemetry")]
        info!(address = %signer.wallet_address(), "Loaded Solana wallet");
        wallets = wallets.with_signer(signer);
    }
    if wallets.is_empty() {
        return Err(CliError::NoWallet);
    }
    Ok(wallets)
}
