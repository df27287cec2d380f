//! Well-known Solana clusters and USDC mints.

use paywire::chain::SOLANA_NAMESPACE;
use paywire::networks::{AssetInfo, NetworkInfo, USDC_SYMBOL};
use solana_pubkey::{Pubkey, pubkey};

/// Genesis-hash reference of Solana mainnet-beta.
pub const SOLANA_MAINNET: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";

/// Genesis-hash reference of Solana devnet.
pub const SOLANA_DEVNET: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1";

/// Native Circle USDC mint on mainnet.
pub const USDC_SOLANA: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// Circle USDC test mint on devnet.
pub const USDC_SOLANA_DEVNET: Pubkey = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

/// Default public RPC endpoint for mainnet-beta.
pub const SOLANA_MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";

/// Default public RPC endpoint for devnet.
pub const SOLANA_DEVNET_RPC: &str = "https://api.devnet.solana.com";

/// Named Solana clusters, for [`paywire::NetworkRegistry`].
pub const SOLANA_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "solana",
        namespace: SOLANA_NAMESPACE,
        reference: SOLANA_MAINNET,
    },
    NetworkInfo {
        name: "solana-devnet",
        namespace: SOLANA_NAMESPACE,
        reference: SOLANA_DEVNET,
    },
];

/// Known USDC mints on Solana clusters.
pub const SOLANA_ASSETS: &[AssetInfo] = &[
    AssetInfo {
        namespace: SOLANA_NAMESPACE,
        reference: SOLANA_MAINNET,
        symbol: USDC_SYMBOL,
        address: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        decimals: 6,
    },
    AssetInfo {
        namespace: SOLANA_NAMESPACE,
        reference: SOLANA_DEVNET,
        symbol: USDC_SYMBOL,
        address: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        decimals: 6,
    },
];
