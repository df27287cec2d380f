//! Known EVM networks and USDC deployments.

use alloy_primitives::{Address, address};
use paywire::chain::EIP155_NAMESPACE;
use paywire::networks::{AssetInfo, NetworkInfo, USDC_SYMBOL};

/// Base Mainnet chain ID.
pub const BASE_MAINNET: u64 = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: u64 = 84532;

/// USDC contract address on Base Mainnet.
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// USDC contract address on Base Sepolia.
pub const USDC_BASE_SEPOLIA: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");

/// Default EIP-712 domain name for USDC.
pub const DEFAULT_USDC_NAME: &str = "USD Coin";

/// Default EIP-712 domain version for USDC.
pub const DEFAULT_USDC_VERSION: &str = "2";

/// Default token decimals for USDC.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

/// Default public RPC endpoint for Base Mainnet.
pub const BASE_MAINNET_RPC: &str = "https://mainnet.base.org";

/// Default public RPC endpoint for Base Sepolia.
pub const BASE_SEPOLIA_RPC: &str = "https://sepolia.base.org";

/// Named EVM networks, for [`paywire::NetworkRegistry`].
pub const EVM_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "base",
        namespace: EIP155_NAMESPACE,
        reference: "8453",
    },
    NetworkInfo {
        name: "base-sepolia",
        namespace: EIP155_NAMESPACE,
        reference: "84532",
    },
];

/// Known USDC deployments on EVM networks.
pub const EVM_ASSETS: &[AssetInfo] = &[
    AssetInfo {
        namespace: EIP155_NAMESPACE,
        reference: "8453",
        symbol: USDC_SYMBOL,
        address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        decimals: DEFAULT_TOKEN_DECIMALS,
    },
    AssetInfo {
        namespace: EIP155_NAMESPACE,
        reference: "84532",
        symbol: USDC_SYMBOL,
        address: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
        decimals: DEFAULT_TOKEN_DECIMALS,
    },
];

/// Returns `true` if `asset` is a known USDC deployment on `chain_id`.
#[must_use]
pub fn is_known_usdc(chain_id: u64, asset: Address) -> bool {
    matches!(
        (chain_id, asset),
        (BASE_MAINNET, USDC_BASE) | (BASE_SEPOLIA, USDC_BASE_SEPOLIA)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_asset_table_matches_constants() {
        for asset in EVM_ASSETS {
            let address = Address::from_str(asset.address).unwrap();
            let chain: u64 = asset.reference.parse().unwrap();
            assert!(is_known_usdc(chain, address), "{}", asset.address);
        }
    }

    #[test]
    fn test_every_asset_has_a_named_network() {
        for asset in EVM_ASSETS {
            assert!(EVM_NETWORKS.iter().any(|n| n.reference == asset.reference));
        }
    }
}
