//! Candidate ordering under caller preferences.
//!
//! [`CandidateSelector`] turns the advertised methods into a try-list. Ranking:
//!
//! 1. preferred network and preferred asset
//! 2. preferred network only
//! 3. preferred asset only
//! 4. everything else
//!
//! Ties keep the server's advertised order. Without fallback the try-list is
//! cut down to the preferred network, so a call pinned to one network never
//! signs on another.

use std::sync::Arc;

use crate::chain::ChainId;
use crate::error::PaymentError;
use crate::networks::{AssetPreference, NetworkPreference, NetworkRegistry};
use crate::requirements::PaymentRequirement;

/// Caller-supplied selection inputs. Per call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Network to try first.
    pub preferred_network: Option<NetworkPreference>,
    /// Asset to try first.
    pub preferred_asset: Option<AssetPreference>,
    /// Whether candidates outside the preference may be tried.
    pub allow_fallback: bool,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            preferred_network: None,
            preferred_asset: None,
            allow_fallback: true,
        }
    }
}

impl SelectionPolicy {
    /// A policy with no preferences and fallback enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preferred network.
    #[must_use]
    pub fn prefer_network(mut self, network: NetworkPreference) -> Self {
        self.preferred_network = Some(network);
        self
    }

    /// Sets the preferred asset.
    #[must_use]
    pub fn prefer_asset(mut self, asset: AssetPreference) -> Self {
        self.preferred_asset = Some(asset);
        self
    }

    /// Enables or disables fallback beyond the preference.
    #[must_use]
    pub const fn allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }
}

/// Anything that can be placed on a try-list.
pub trait Selectable {
    /// Network the method settles on.
    fn network(&self) -> &ChainId;
    /// Asset the method pays with.
    fn asset(&self) -> &str;
}

impl Selectable for PaymentRequirement {
    fn network(&self) -> &ChainId {
        &self.network
    }

    fn asset(&self) -> &str {
        &self.asset
    }
}

impl<T: Selectable> Selectable for (usize, T) {
    fn network(&self) -> &ChainId {
        self.1.network()
    }

    fn asset(&self) -> &str {
        self.1.asset()
    }
}

/// Orders and filters candidates by [`SelectionPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CandidateSelector {
    registry: Arc<NetworkRegistry>,
}

impl CandidateSelector {
    /// Creates a selector that recognises assets known to `registry`.
    #[must_use]
    pub const fn new(registry: Arc<NetworkRegistry>) -> Self {
        Self { registry }
    }

    /// The registry used to recognise asset aliases.
    #[must_use]
    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    fn rank<T: Selectable>(&self, item: &T, policy: &SelectionPolicy) -> u8 {
        let network = policy
            .preferred_network
            .as_ref()
            .is_some_and(|p| p.matches(item.network()));
        let asset = policy
            .preferred_asset
            .as_ref()
            .is_some_and(|p| p.matches(&self.registry, item.network(), item.asset()));
        match (network, asset) {
            (true, true) => 1,
            (true, false) => 2,
            (false, true) => 3,
            (false, false) => 4,
        }
    }

    /// Produces the try-list, most preferred first.
    ///
    /// Without fallback, only candidates on the preferred network survive. If
    /// only an asset is preferred, only candidates with that asset survive. If
    /// nothing is preferred, only the first advertised candidate survives.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NoMatchingMethod`] if the try-list would be empty.
    pub fn select<T: Selectable>(
        &self,
        candidates: Vec<T>,
        policy: &SelectionPolicy,
    ) -> Result<Vec<T>, PaymentError> {
        let mut ranked: Vec<(u8, T)> = candidates
            .into_iter()
            .map(|c| (self.rank(&c, policy), c))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);

        let cutoff = match (
            policy.allow_fallback,
            &policy.preferred_network,
            &policy.preferred_asset,
        ) {
            (true, _, _) => 4,
            (false, Some(_), _) => 2,
            (false, None, Some(_)) => 3,
            (false, None, None) => {
                ranked.truncate(1);
                4
            }
        };
        let try_list: Vec<T> = ranked
            .into_iter()
            .filter(|(rank, _)| *rank <= cutoff)
            .map(|(_, c)| c)
            .collect();

        if try_list.is_empty() {
            let network = policy
                .preferred_network
                .as_ref()
                .map_or_else(|| "any".to_owned(), ToString::to_string);
            let asset = policy
                .preferred_asset
                .as_ref()
                .map_or_else(|| "any".to_owned(), ToString::to_string);
            return Err(PaymentError::NoMatchingMethod(format!(
                "network={network} asset={asset} allowFallback={}",
                policy.allow_fallback
            )));
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            candidates = try_list.len(),
            allow_fallback = policy.allow_fallback,
            "Built payment try-list"
        );
        Ok(try_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::tests::{BASE_USDC, SOLANA_MAINNET, SOLANA_USDC, test_registry};

    #[derive(Debug, Clone, PartialEq)]
    struct Method(ChainId, &'static str);

    impl Selectable for Method {
        fn network(&self) -> &ChainId {
            &self.0
        }

        fn asset(&self) -> &str {
            self.1
        }
    }

    const ONELY_MINT: &str = "So11111111111111111111111111111111111111112";

    fn base_usdc() -> Method {
        Method(ChainId::new("eip155", "8453"), BASE_USDC)
    }

    fn sol_usdc() -> Method {
        Method(ChainId::new("solana", SOLANA_MAINNET), SOLANA_USDC)
    }

    fn sol_onely() -> Method {
        Method(ChainId::new("solana", SOLANA_MAINNET), ONELY_MINT)
    }

    fn selector() -> CandidateSelector {
        CandidateSelector::new(Arc::new(test_registry()))
    }

    fn base() -> NetworkPreference {
        test_registry().network_preference("base").unwrap()
    }

    fn solana() -> NetworkPreference {
        test_registry().network_preference("solana").unwrap()
    }

    #[test]
    fn test_no_preference_keeps_order() {
        let list = vec![sol_usdc(), base_usdc(), sol_onely()];
        let out = selector().select(list.clone(), &SelectionPolicy::new()).unwrap();
        assert_eq!(out, list);
    }

    #[test]
    fn test_no_preference_without_fallback_takes_first() {
        let list = vec![sol_usdc(), base_usdc()];
        let policy = SelectionPolicy::new().allow_fallback(false);
        let out = selector().select(list, &policy).unwrap();
        assert_eq!(out, vec![sol_usdc()]);
    }

    #[test]
    fn test_full_ranking() {
        let list = vec![sol_onely(), base_usdc(), sol_usdc()];
        let policy = SelectionPolicy::new()
            .prefer_network(solana())
            .prefer_asset(AssetPreference::Usdc);
        let out = selector().select(list, &policy).unwrap();
        assert_eq!(out, vec![sol_usdc(), sol_onely(), base_usdc()]);
    }

    #[test]
    fn test_asset_only_rank_beats_rest() {
        let eth_weth = Method(
            ChainId::new("eip155", "8453"),
            "0x4200000000000000000000000000000000000006",
        );
        let list = vec![eth_weth.clone(), sol_onely(), base_usdc()];
        let policy = SelectionPolicy::new()
            .prefer_network(solana())
            .prefer_asset(AssetPreference::Usdc);
        let out = selector().select(list, &policy).unwrap();
        assert_eq!(out, vec![sol_onely(), base_usdc(), eth_weth]);
    }

    #[test]
    fn test_pinned_network_never_leaks() {
        let list = vec![sol_usdc(), base_usdc()];
        let policy = SelectionPolicy::new()
            .prefer_network(base())
            .allow_fallback(false);
        let out = selector().select(list, &policy).unwrap();
        assert_eq!(out, vec![base_usdc()]);
    }

    #[test]
    fn test_pinned_base_skips_other_evm_chains() {
        let mainnet = Method(
            ChainId::new("eip155", "1"),
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        );
        let sepolia = Method(
            ChainId::new("eip155", "84532"),
            "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
        );
        let list = vec![mainnet, sepolia, base_usdc()];
        let policy = SelectionPolicy::new()
            .prefer_network(base())
            .allow_fallback(false);
        let out = selector().select(list, &policy).unwrap();
        assert_eq!(out, vec![base_usdc()]);
    }

    #[test]
    fn test_pinned_network_keeps_other_assets() {
        let list = vec![base_usdc(), sol_onely(), sol_usdc()];
        let policy = SelectionPolicy::new()
            .prefer_network(solana())
            .prefer_asset(AssetPreference::Usdc)
            .allow_fallback(false);
        let out = selector().select(list, &policy).unwrap();
        assert_eq!(out, vec![sol_usdc(), sol_onely()]);
    }

    #[test]
    fn test_pinned_network_without_match_fails() {
        let list = vec![sol_usdc(), sol_onely()];
        let policy = SelectionPolicy::new()
            .prefer_network(base())
            .allow_fallback(false);
        let err = selector().select(list, &policy).unwrap_err();
        assert!(matches!(err, PaymentError::NoMatchingMethod(_)));
    }

    #[test]
    fn test_asset_only_without_fallback() {
        let list = vec![sol_onely(), base_usdc(), sol_usdc()];
        let policy = SelectionPolicy::new()
            .prefer_asset(AssetPreference::Usdc)
            .allow_fallback(false);
        let out = selector().select(list, &policy).unwrap();
        assert_eq!(out, vec![base_usdc(), sol_usdc()]);
    }

    #[test]
    fn test_unmatched_preferences_with_fallback_keep_server_order() {
        let list = vec![sol_usdc(), sol_onely()];
        let policy = SelectionPolicy::new()
            .prefer_network(base())
            .prefer_asset(AssetPreference::Address("0xdead".into()));
        let out = selector().select(list.clone(), &policy).unwrap();
        assert_eq!(out, list);
    }

    #[test]
    fn test_pinned_network_property_over_permutations() {
        let pool = [sol_usdc(), base_usdc(), sol_onely()];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let list: Vec<Method> = order.iter().map(|i| pool[*i].clone()).collect();
            for pref in [base(), solana()] {
                let policy = SelectionPolicy::new()
                    .prefer_network(pref.clone())
                    .allow_fallback(false);
                let out = selector().select(list.clone(), &policy).unwrap();
                assert!(out.iter().all(|m| pref.matches(m.network())));
            }
        }
    }
}
