//! SPL mint `decimals` lookup.

use async_trait::async_trait;
use paywire::chain::ChainId;
use paywire::decimals::{DecimalsSource, DecimalsSourceError};
use solana_pubkey::Pubkey;
use std::str::FromStr;
#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::mint::{MintError, fetch_mint};
use crate::rpc::RpcRoutes;

/// Reads token precision from mint accounts.
#[derive(Debug, Clone, Default)]
pub struct SolanaDecimalsSource {
    routes: RpcRoutes,
}

impl SolanaDecimalsSource {
    /// Queries mints through `routes`.
    #[must_use]
    pub const fn new(routes: RpcRoutes) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl DecimalsSource for SolanaDecimalsSource {
    async fn fetch_decimals(
        &self,
        network: &ChainId,
        asset: &str,
    ) -> Result<u8, DecimalsSourceError> {
        let rpc = self.routes.get(network).ok_or_else(|| {
            DecimalsSourceError::Unreachable(format!("no RPC endpoint configured for {network}"))
        })?;
        let mint = Pubkey::from_str(asset)
            .map_err(|_| DecimalsSourceError::UnknownAsset(asset.to_owned()))?;
        let decimals = fetch_mint(rpc.as_ref(), &mint)
            .await
            .map_err(|e| match e {
                MintError::Rpc(e) => DecimalsSourceError::Unreachable(e.to_string()),
                other => DecimalsSourceError::UnknownAsset(other.to_string()),
            })?
            .decimals();
        #[cfg(feature = "telemetry")]
        debug!(%network, %mint, decimals, "Fetched mint decimals");
        Ok(decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{SOLANA_MAINNET, USDC_SOLANA};
    use crate::rpc::tests::MockLedger;

    fn mainnet() -> ChainId {
        ChainId::new("solana", SOLANA_MAINNET)
    }

    #[tokio::test]
    async fn test_reads_mint_decimals() {
        let routes = RpcRoutes::new().with(mainnet(), MockLedger::new().with_mint(USDC_SOLANA, 6));
        let source = SolanaDecimalsSource::new(routes);
        let decimals = source
            .fetch_decimals(&mainnet(), &USDC_SOLANA.to_string())
            .await
            .unwrap();
        assert_eq!(decimals, 6);
    }

    #[tokio::test]
    async fn test_failure_kinds() {
        let source = SolanaDecimalsSource::default();
        let err = source
            .fetch_decimals(&mainnet(), &USDC_SOLANA.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DecimalsSourceError::Unreachable(_)));

        let source = SolanaDecimalsSource::new(RpcRoutes::new().with(mainnet(), MockLedger::new()));
        let err = source.fetch_decimals(&mainnet(), "not-base58!").await.unwrap_err();
        assert!(matches!(err, DecimalsSourceError::UnknownAsset(_)));
        let err = source
            .fetch_decimals(&mainnet(), &USDC_SOLANA.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DecimalsSourceError::UnknownAsset(_)));
    }
}
