//! Asset precision lookup with a process-wide single-flight cache.
//!
//! [`AssetDecimalsResolver`] maps `(network, asset)` to the token's decimals.
//! Lookups go to a chain-specific [`DecimalsSource`] at most once per key:
//! concurrent callers for the same missing key wait on the same in-flight
//! query, and a successful answer is kept for the life of the process.
//! Failures are not cached, so a later call retries the lookup.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::chain::{ChainId, NetworkFamily};
use crate::error::PaymentError;
use crate::networks::NetworkRegistry;
use crate::timestamp::UnixTimestamp;

/// Errors a [`DecimalsSource`] can report.
#[derive(Debug, thiserror::Error)]
pub enum DecimalsSourceError {
    /// The asset does not exist or is not a token.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),
    /// The network could not be reached or returned garbage.
    #[error("network unreachable: {0}")]
    Unreachable(String),
}

/// A chain-specific way of asking an asset for its precision.
#[async_trait]
pub trait DecimalsSource: Send + Sync {
    /// Fetches the decimals of `asset` on `network`.
    async fn fetch_decimals(
        &self,
        network: &ChainId,
        asset: &str,
    ) -> Result<u8, DecimalsSourceError>;
}

#[async_trait]
impl<T: DecimalsSource + ?Sized> DecimalsSource for Arc<T> {
    async fn fetch_decimals(
        &self,
        network: &ChainId,
        asset: &str,
    ) -> Result<u8, DecimalsSourceError> {
        (**self).fetch_decimals(network, asset).await
    }
}

/// Fixed table of decimals, useful offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDecimals {
    table: HashMap<(ChainId, String), u8>,
}

impl StaticDecimals {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, network: ChainId, asset: &str, decimals: u8) -> Self {
        let key = cache_key(&network, asset);
        self.table.insert(key, decimals);
        self
    }
}

#[async_trait]
impl DecimalsSource for StaticDecimals {
    async fn fetch_decimals(
        &self,
        network: &ChainId,
        asset: &str,
    ) -> Result<u8, DecimalsSourceError> {
        self.table
            .get(&cache_key(network, asset))
            .copied()
            .ok_or_else(|| DecimalsSourceError::UnknownAsset(asset.to_owned()))
    }
}

/// A cached precision value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalsCacheEntry {
    /// Token decimals.
    pub decimals: u8,
    /// When the value was fetched or seeded.
    pub fetched_at: UnixTimestamp,
}

type CacheKey = (ChainId, String);

/// Resolves and caches asset precision per `(network, asset)`.
///
/// Cheap to share: wrap in an [`Arc`] and hand the same instance to every
/// engine so all calls benefit from one cache.
#[derive(Default)]
pub struct AssetDecimalsResolver {
    sources: HashMap<NetworkFamily, Arc<dyn DecimalsSource>>,
    cache: DashMap<CacheKey, Arc<OnceCell<DecimalsCacheEntry>>>,
}

impl fmt::Debug for AssetDecimalsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetDecimalsResolver")
            .field("families", &self.sources.keys().collect::<Vec<_>>())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl AssetDecimalsResolver {
    /// Creates a resolver with no sources and an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the source used for every chain of `family`.
    #[must_use]
    pub fn with_source<S>(mut self, family: NetworkFamily, source: S) -> Self
    where
        S: DecimalsSource + 'static,
    {
        self.sources.insert(family, Arc::new(source));
        self
    }

    /// Seeds the cache with every asset deployment known to `registry`.
    #[must_use]
    pub fn with_known_assets(self, registry: &NetworkRegistry) -> Self {
        let now = UnixTimestamp::now();
        for asset in registry.assets() {
            let entry = DecimalsCacheEntry {
                decimals: asset.decimals,
                fetched_at: now,
            };
            self.cache.insert(
                cache_key(&asset.chain_id(), asset.address),
                Arc::new(OnceCell::new_with(Some(entry))),
            );
        }
        self
    }

    /// Returns the cached entry for a key, if any.
    #[must_use]
    pub fn cached(&self, network: &ChainId, asset: &str) -> Option<DecimalsCacheEntry> {
        self.cache
            .get(&cache_key(network, asset))
            .and_then(|cell| cell.get().copied())
    }

    /// Resolves the decimals of `asset` on `network`.
    ///
    /// When no source is registered for the network's family, the server's
    /// `hint` is used if present.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::AssetResolution`] if the source fails or no
    /// source and no hint are available.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "paywire.decimals.resolve", skip_all, fields(network = %network, asset = %asset), err)
    )]
    pub async fn resolve(
        &self,
        network: &ChainId,
        asset: &str,
        hint: Option<u8>,
    ) -> Result<u8, PaymentError> {
        let key = cache_key(network, asset);
        if let Some(entry) = self.cache.get(&key).and_then(|cell| cell.get().copied()) {
            return Ok(entry.decimals);
        }

        let source = match network.family().and_then(|f| self.sources.get(&f)) {
            Some(source) => Arc::clone(source),
            None => {
                return hint.ok_or_else(|| PaymentError::AssetResolution {
                    network: network.clone(),
                    asset: asset.to_owned(),
                    reason: "no decimals source for this network".into(),
                });
            }
        };

        let cell = Arc::clone(self.cache.entry(key.clone()).or_default().value());
        let fetched = cell
            .get_or_try_init(|| async {
                #[cfg(feature = "telemetry")]
                debug!(asset, "Fetching asset decimals");
                let decimals = source.fetch_decimals(network, asset).await?;
                Ok::<_, DecimalsSourceError>(DecimalsCacheEntry {
                    decimals,
                    fetched_at: UnixTimestamp::now(),
                })
            })
            .await;
        match fetched {
            Ok(entry) => Ok(entry.decimals),
            Err(e) => {
                self.cache.remove_if(&key, |_, cell| !cell.initialized());
                Err(PaymentError::AssetResolution {
                    network: network.clone(),
                    asset: asset.to_owned(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn cache_key(network: &ChainId, asset: &str) -> CacheKey {
    let asset = match network.family() {
        Some(NetworkFamily::Evm) => asset.to_ascii_lowercase(),
        _ => asset.to_owned(),
    };
    (network.clone(), asset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::tests::{BASE_USDC, test_registry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        calls: AtomicUsize,
        decimals: Option<u8>,
    }

    #[async_trait]
    impl DecimalsSource for CountingSource {
        async fn fetch_decimals(
            &self,
            _network: &ChainId,
            asset: &str,
        ) -> Result<u8, DecimalsSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.decimals
                .ok_or_else(|| DecimalsSourceError::UnknownAsset(asset.to_owned()))
        }
    }

    fn base() -> ChainId {
        ChainId::new("eip155", "8453")
    }

    const OTHER_TOKEN: &str = "0x4200000000000000000000000000000000000006";

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            decimals: Some(18),
        });
        let resolver = Arc::new(
            AssetDecimalsResolver::new().with_source(NetworkFamily::Evm, Arc::clone(&source)),
        );
        let lookups = (0..16).map(|_| {
            let resolver = Arc::clone(&resolver);
            async move { resolver.resolve(&base(), OTHER_TOKEN, None).await }
        });
        let results = futures_util::future::join_all(lookups).await;
        assert!(results.iter().all(|r| matches!(r, Ok(18))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached(&base(), OTHER_TOKEN).map(|e| e.decimals), Some(18));
    }

    #[tokio::test]
    async fn test_cache_key_ignores_evm_case() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            decimals: Some(18),
        });
        let resolver =
            AssetDecimalsResolver::new().with_source(NetworkFamily::Evm, Arc::clone(&source));
        resolver.resolve(&base(), OTHER_TOKEN, None).await.unwrap();
        resolver
            .resolve(&base(), &OTHER_TOKEN.to_uppercase().replace("0X", "0x"), None)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            decimals: None,
        });
        let resolver =
            AssetDecimalsResolver::new().with_source(NetworkFamily::Evm, Arc::clone(&source));
        for _ in 0..2 {
            let err = resolver.resolve(&base(), OTHER_TOKEN, None).await.unwrap_err();
            assert!(matches!(err, PaymentError::AssetResolution { .. }));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(resolver.cached(&base(), OTHER_TOKEN).is_none());
    }

    #[tokio::test]
    async fn test_failed_lookups_leave_no_entries() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            decimals: None,
        });
        let resolver = AssetDecimalsResolver::new()
            .with_source(NetworkFamily::Evm, Arc::clone(&source))
            .with_known_assets(&test_registry());
        let seeded = resolver.cache.len();
        for n in 0..8 {
            let garbage = format!("0x{n:040x}");
            assert!(resolver.resolve(&base(), &garbage, None).await.is_err());
        }
        assert!(resolver.resolve(&base(), OTHER_TOKEN, Some(6)).await.is_err());
        assert_eq!(resolver.cache.len(), seeded);

        let none = AssetDecimalsResolver::new();
        assert!(none.resolve(&base(), OTHER_TOKEN, None).await.is_err());
        assert_eq!(none.cache.len(), 0);
    }

    #[tokio::test]
    async fn test_known_assets_skip_the_network() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            decimals: Some(18),
        });
        let resolver = AssetDecimalsResolver::new()
            .with_source(NetworkFamily::Evm, Arc::clone(&source))
            .with_known_assets(&test_registry());
        assert_eq!(resolver.resolve(&base(), BASE_USDC, None).await.unwrap(), 6);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hint_used_only_without_source() {
        let resolver = AssetDecimalsResolver::new();
        assert_eq!(resolver.resolve(&base(), OTHER_TOKEN, Some(9)).await.unwrap(), 9);
        let err = resolver.resolve(&base(), OTHER_TOKEN, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::AssetResolution { .. }));
    }

    #[tokio::test]
    async fn test_static_source() {
        let resolver = AssetDecimalsResolver::new().with_source(
            NetworkFamily::Evm,
            StaticDecimals::new().with(base(), OTHER_TOKEN, 18),
        );
        assert_eq!(resolver.resolve(&base(), OTHER_TOKEN, None).await.unwrap(), 18);
    }
}
