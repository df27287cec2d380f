//! ERC-20 `decimals()` lookup over JSON-RPC.

use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_sol_types::sol;
use async_trait::async_trait;
use paywire::chain::ChainId;
use paywire::decimals::{DecimalsSource, DecimalsSourceError};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "telemetry")]
use tracing::debug;
use url::Url;

sol! {
    /// Metadata subset of ERC-20.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20Metadata {
        function decimals() external view returns (uint8);
    }
}

/// Reads token precision from ERC-20 contracts, one provider per chain.
#[derive(Clone, Default)]
pub struct EvmDecimalsSource {
    providers: HashMap<ChainId, DynProvider>,
}

impl fmt::Debug for EvmDecimalsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmDecimalsSource")
            .field("chains", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EvmDecimalsSource {
    /// A source with no chains configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes lookups for `chain_id` to `provider`.
    #[must_use]
    pub fn with_provider<P>(mut self, chain_id: ChainId, provider: P) -> Self
    where
        P: Provider + 'static,
    {
        self.providers.insert(chain_id, provider.erased());
        self
    }

    /// Routes lookups for `chain_id` to a plain HTTP JSON-RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `rpc_url` is not a URL.
    pub fn with_rpc_url(self, chain_id: ChainId, rpc_url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(rpc_url)?;
        let provider = ProviderBuilder::new().connect_http(url);
        Ok(self.with_provider(chain_id, provider))
    }
}

#[async_trait]
impl DecimalsSource for EvmDecimalsSource {
    async fn fetch_decimals(
        &self,
        network: &ChainId,
        asset: &str,
    ) -> Result<u8, DecimalsSourceError> {
        let provider = self.providers.get(network).cloned().ok_or_else(|| {
            DecimalsSourceError::Unreachable(format!("no RPC endpoint configured for {network}"))
        })?;
        let address = Address::from_str(asset)
            .map_err(|_| DecimalsSourceError::UnknownAsset(asset.to_owned()))?;

        let code = provider
            .get_code_at(address)
            .await
            .map_err(|e| DecimalsSourceError::Unreachable(e.to_string()))?;
        if code.is_empty() {
            return Err(DecimalsSourceError::UnknownAsset(format!(
                "no contract deployed at {address}"
            )));
        }

        let contract = IERC20Metadata::new(address, provider);
        let decimals = contract
            .decimals()
            .call()
            .await
            .map_err(|e| DecimalsSourceError::UnknownAsset(format!("{address}: {e}")))?;
        #[cfg(feature = "telemetry")]
        debug!(%network, %address, decimals, "Fetched ERC-20 decimals");
        Ok(decimals)
    }
}
