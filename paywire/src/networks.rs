//! Network and asset registry, plus caller preference parsing.
//!
//! This module provides abstract types for mapping human-readable network
//! names (e.g., `"base"`) to CAIP-2 chain identifiers (e.g., `eip155:8453`)
//! and for recognising well-known asset deployments on those chains.
//!
//! Concrete network data lives in chain-specific crates:
//!
//! - `paywire-evm` provides `EVM_NETWORKS` and `EVM_ASSETS`
//! - `paywire-svm` provides `SOLANA_NETWORKS` and `SOLANA_ASSETS`
//!
//! Applications assemble a [`NetworkRegistry`] from these slices at startup.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::chain::{ChainId, NetworkFamily};

/// Ticker of the stablecoin every supported network carries.
pub const USDC_SYMBOL: &str = "USDC";

/// Ticker alias for "any non-USDC Solana token" (the marketplace's own token).
pub const ONELY_SYMBOL: &str = "1LY";

/// A known network definition with its chain ID and human-readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name (e.g., "base-sepolia", "solana")
    pub name: &'static str,
    /// CAIP-2 namespace (e.g., "eip155", "solana")
    pub namespace: &'static str,
    /// Chain reference (e.g., "84532" for Base Sepolia)
    pub reference: &'static str,
}

impl NetworkInfo {
    /// Create a `ChainId` from this network info
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

/// A well-known token deployment on a specific network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    /// CAIP-2 namespace of the hosting chain.
    pub namespace: &'static str,
    /// CAIP-2 reference of the hosting chain.
    pub reference: &'static str,
    /// Ticker symbol (e.g., `USDC`).
    pub symbol: &'static str,
    /// Contract address (EVM) or mint address (Solana).
    pub address: &'static str,
    /// Token precision.
    pub decimals: u8,
}

impl AssetInfo {
    /// The chain this asset is deployed on.
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

/// Compares two asset identifiers the way the hosting chain does.
///
/// EVM addresses are hex and compare case-insensitively; Solana mints are
/// base58 and compare exactly.
#[must_use]
pub fn same_asset(chain_id: &ChainId, a: &str, b: &str) -> bool {
    match chain_id.family() {
        Some(NetworkFamily::Evm) => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}

/// Registry of known networks and asset deployments.
///
/// Built from one or more `&[NetworkInfo]` / `&[AssetInfo]` slices provided by
/// chain-specific crates.
///
/// # Example
///
/// ```ignore
/// use paywire::networks::NetworkRegistry;
///
/// let registry = NetworkRegistry::from_networks(paywire_evm::EVM_NETWORKS)
///     .with_networks(paywire_svm::SOLANA_NETWORKS)
///     .with_assets(paywire_evm::EVM_ASSETS)
///     .with_assets(paywire_svm::SOLANA_ASSETS);
///
/// let chain_id = registry.chain_id_by_name("base").unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    name_to_chain_id: HashMap<&'static str, ChainId>,
    chain_id_to_name: HashMap<ChainId, &'static str>,
    assets: HashMap<ChainId, Vec<AssetInfo>>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated from a network info slice.
    #[must_use]
    pub fn from_networks(networks: &[NetworkInfo]) -> Self {
        let mut registry = Self::new();
        registry.register(networks);
        registry
    }

    /// Registers additional networks into this registry.
    pub fn register(&mut self, networks: &[NetworkInfo]) {
        for info in networks {
            self.name_to_chain_id.insert(info.name, info.chain_id());
            self.chain_id_to_name.insert(info.chain_id(), info.name);
        }
    }

    /// Registers additional asset deployments into this registry.
    pub fn register_assets(&mut self, assets: &[AssetInfo]) {
        for asset in assets {
            self.assets.entry(asset.chain_id()).or_default().push(*asset);
        }
    }

    /// Builder-style method: registers additional networks and returns `self`.
    #[must_use]
    pub fn with_networks(mut self, networks: &[NetworkInfo]) -> Self {
        self.register(networks);
        self
    }

    /// Builder-style method: registers additional assets and returns `self`.
    #[must_use]
    pub fn with_assets(mut self, assets: &[AssetInfo]) -> Self {
        self.register_assets(assets);
        self
    }

    /// Looks up a [`ChainId`] by its human-readable network name.
    #[must_use]
    pub fn chain_id_by_name(&self, name: &str) -> Option<&ChainId> {
        self.name_to_chain_id.get(name)
    }

    /// Looks up a human-readable network name by its [`ChainId`].
    #[must_use]
    pub fn name_by_chain_id(&self, chain_id: &ChainId) -> Option<&'static str> {
        self.chain_id_to_name.get(chain_id).copied()
    }

    /// Finds a known asset deployment by chain and address.
    #[must_use]
    pub fn asset(&self, chain_id: &ChainId, address: &str) -> Option<&AssetInfo> {
        self.assets
            .get(chain_id)?
            .iter()
            .find(|a| same_asset(chain_id, a.address, address))
    }

    /// Finds a known asset deployment by chain and ticker symbol.
    #[must_use]
    pub fn asset_by_symbol(&self, chain_id: &ChainId, symbol: &str) -> Option<&AssetInfo> {
        self.assets
            .get(chain_id)?
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Iterates over every registered asset deployment.
    pub fn assets(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.values().flatten()
    }

    /// Returns `true` if `address` is the USDC deployment on `chain_id`.
    #[must_use]
    pub fn is_usdc(&self, chain_id: &ChainId, address: &str) -> bool {
        self.asset(chain_id, address)
            .is_some_and(|a| a.symbol == USDC_SYMBOL)
    }

    /// Resolves a caller-supplied network preference.
    ///
    /// Registered names resolve to exactly one chain: `base` is Base mainnet
    /// and `solana` is Solana mainnet. Only the explicit family names `evm`
    /// and `svm` span several chains. Raw CAIP-2 identifiers are used as given.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the value is none of the above.
    pub fn network_preference(&self, value: &str) -> Result<NetworkPreference, PreferenceError> {
        let trimmed = value.trim();
        if let Some(chain_id) = self
            .chain_id_by_name(trimmed)
            .or_else(|| self.chain_id_by_name(&trimmed.to_ascii_lowercase()))
        {
            return Ok(NetworkPreference::Chain(chain_id.clone()));
        }
        trimmed.parse()
    }
}

/// Error returned for preference values that name nothing we know.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unrecognised {kind} preference: {value}")]
pub struct PreferenceError {
    kind: &'static str,
    value: String,
}

/// Which network(s) the caller would rather pay on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkPreference {
    /// Any chain of the given family, testnets included. Spelled `evm` or `svm`.
    Family(NetworkFamily),
    /// Exactly this chain.
    Chain(ChainId),
}

impl NetworkPreference {
    fn family_alias(value: &str) -> Option<NetworkFamily> {
        match value.to_ascii_lowercase().as_str() {
            "evm" => Some(NetworkFamily::Evm),
            "svm" => Some(NetworkFamily::Solana),
            _ => None,
        }
    }

    /// Returns `true` if a candidate on `chain_id` satisfies this preference.
    #[must_use]
    pub fn matches(&self, chain_id: &ChainId) -> bool {
        match self {
            Self::Family(family) => chain_id.family() == Some(*family),
            Self::Chain(chain) => chain == chain_id,
        }
    }
}

impl FromStr for NetworkPreference {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(family) = Self::family_alias(s) {
            return Ok(Self::Family(family));
        }
        s.parse::<ChainId>()
            .map(Self::Chain)
            .map_err(|_| PreferenceError {
                kind: "network",
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for NetworkPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Family(NetworkFamily::Evm) => f.write_str("evm"),
            Self::Family(NetworkFamily::Solana) => f.write_str("svm"),
            Self::Chain(chain_id) => write!(f, "{chain_id}"),
        }
    }
}

/// Which asset the caller would rather pay with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPreference {
    /// The USDC deployment on whichever network the candidate is on.
    Usdc,
    /// Any Solana asset other than USDC.
    OneLy,
    /// A specific contract or mint address.
    Address(String),
}

impl AssetPreference {
    /// Returns `true` if `asset` on `chain_id` satisfies this preference.
    #[must_use]
    pub fn matches(&self, registry: &NetworkRegistry, chain_id: &ChainId, asset: &str) -> bool {
        match self {
            Self::Usdc => registry.is_usdc(chain_id, asset),
            Self::OneLy => {
                chain_id.family() == Some(NetworkFamily::Solana)
                    && !registry.is_usdc(chain_id, asset)
            }
            Self::Address(address) => same_asset(chain_id, address, asset),
        }
    }
}

impl FromStr for AssetPreference {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PreferenceError {
                kind: "asset",
                value: s.to_owned(),
            });
        }
        if trimmed.eq_ignore_ascii_case(USDC_SYMBOL) {
            Ok(Self::Usdc)
        } else if trimmed.eq_ignore_ascii_case(ONELY_SYMBOL) {
            Ok(Self::OneLy)
        } else {
            Ok(Self::Address(trimmed.to_owned()))
        }
    }
}

impl fmt::Display for AssetPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usdc => f.write_str(USDC_SYMBOL),
            Self::OneLy => f.write_str(ONELY_SYMBOL),
            Self::Address(address) => f.write_str(address),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const BASE_USDC: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    pub(crate) const SOLANA_USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    pub(crate) const SOLANA_MAINNET: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";

    pub(crate) fn test_registry() -> NetworkRegistry {
        NetworkRegistry::from_networks(&[
            NetworkInfo {
                name: "base",
                namespace: "eip155",
                reference: "8453",
            },
            NetworkInfo {
                name: "base-sepolia",
                namespace: "eip155",
                reference: "84532",
            },
            NetworkInfo {
                name: "solana",
                namespace: "solana",
                reference: SOLANA_MAINNET,
            },
        ])
        .with_assets(&[
            AssetInfo {
                namespace: "eip155",
                reference: "8453",
                symbol: USDC_SYMBOL,
                address: BASE_USDC,
                decimals: 6,
            },
            AssetInfo {
                namespace: "solana",
                reference: SOLANA_MAINNET,
                symbol: USDC_SYMBOL,
                address: SOLANA_USDC,
                decimals: 6,
            },
        ])
    }

    #[test]
    fn test_base_and_solana_name_one_chain() {
        let registry = test_registry();
        let base = registry.network_preference("base").unwrap();
        assert_eq!(base, NetworkPreference::Chain(ChainId::new("eip155", "8453")));
        assert!(!base.matches(&ChainId::new("eip155", "84532")));
        assert!(!base.matches(&ChainId::new("eip155", "1")));

        let solana = registry.network_preference("Solana").unwrap();
        assert_eq!(
            solana,
            NetworkPreference::Chain(ChainId::new("solana", SOLANA_MAINNET))
        );
    }

    #[test]
    fn test_family_names_span_the_family() {
        let registry = test_registry();
        let pref = registry.network_preference("evm").unwrap();
        assert_eq!(pref, NetworkPreference::Family(NetworkFamily::Evm));
        assert!(pref.matches(&ChainId::new("eip155", "84532")));
        assert!(!pref.matches(&ChainId::new("solana", SOLANA_MAINNET)));
        assert_eq!(pref.to_string(), "evm");
        assert!(NetworkRegistry::new().network_preference("base").is_err());
    }

    #[test]
    fn test_named_network_preference() {
        let registry = test_registry();
        let pref = registry.network_preference("base-sepolia").unwrap();
        assert_eq!(pref, NetworkPreference::Chain(ChainId::new("eip155", "84532")));
        assert!(!pref.matches(&ChainId::new("eip155", "8453")));
    }

    #[test]
    fn test_caip2_network_preference() {
        let pref: NetworkPreference = "eip155:1".parse().unwrap();
        assert_eq!(pref, NetworkPreference::Chain(ChainId::new("eip155", "1")));
        assert!("nonsense".parse::<NetworkPreference>().is_err());
    }

    #[test]
    fn test_usdc_preference_is_per_network() {
        let registry = test_registry();
        let base = ChainId::new("eip155", "8453");
        let solana = ChainId::new("solana", SOLANA_MAINNET);
        let pref: AssetPreference = "usdc".parse().unwrap();
        assert!(pref.matches(&registry, &base, &BASE_USDC.to_lowercase()));
        assert!(pref.matches(&registry, &solana, SOLANA_USDC));
        assert!(!pref.matches(&registry, &solana, "So11111111111111111111111111111111111111112"));
    }

    #[test]
    fn test_onely_preference_excludes_usdc_and_evm() {
        let registry = test_registry();
        let solana = ChainId::new("solana", SOLANA_MAINNET);
        let pref: AssetPreference = "1LY".parse().unwrap();
        assert!(pref.matches(&registry, &solana, "So11111111111111111111111111111111111111112"));
        assert!(!pref.matches(&registry, &solana, SOLANA_USDC));
        assert!(!pref.matches(&registry, &ChainId::new("eip155", "8453"), BASE_USDC));
    }

    #[test]
    fn test_asset_lookup_is_case_insensitive_on_evm() {
        let registry = test_registry();
        let base = ChainId::new("eip155", "8453");
        let info = registry.asset(&base, &BASE_USDC.to_uppercase().replace("0X", "0x"));
        assert_eq!(info.map(|a| a.decimals), Some(6));
    }
}
