//! The slice of Solana JSON-RPC the client needs.
//!
//! [`SolanaRpc`] is the seam between signing logic and the network, so the
//! transaction builder can be exercised against an in-memory ledger.

use async_trait::async_trait;
use paywire::chain::ChainId;
use solana_account::Account;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_message::Hash;
use solana_pubkey::Pubkey;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A failed RPC round trip.
#[derive(Debug, thiserror::Error)]
#[error("Solana RPC error: {0}")]
pub struct SolanaRpcError(pub String);

/// Read-only Solana queries used while building a transfer.
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Fetches an account, or `None` if it does not exist.
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, SolanaRpcError>;

    /// Fetches a recent blockhash to anchor a transaction.
    async fn get_latest_blockhash(&self) -> Result<Hash, SolanaRpcError>;
}

#[async_trait]
impl SolanaRpc for RpcClient {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, SolanaRpcError> {
        let response = self
            .get_account_with_commitment(pubkey, self.commitment())
            .await
            .map_err(|e| SolanaRpcError(e.to_string()))?;
        Ok(response.value)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, SolanaRpcError> {
        Self::get_latest_blockhash(self)
            .await
            .map_err(|e| SolanaRpcError(e.to_string()))
    }
}

#[async_trait]
impl<T: SolanaRpc + ?Sized> SolanaRpc for Arc<T> {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, SolanaRpcError> {
        (**self).get_account(pubkey).await
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, SolanaRpcError> {
        (**self).get_latest_blockhash().await
    }
}

/// One RPC client per Solana cluster.
#[derive(Clone, Default)]
pub struct RpcRoutes {
    routes: HashMap<ChainId, Arc<dyn SolanaRpc>>,
}

impl fmt::Debug for RpcRoutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcRoutes")
            .field("chains", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RpcRoutes {
    /// No clusters configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `chain_id` to `rpc`.
    #[must_use]
    pub fn with<R: SolanaRpc + 'static>(mut self, chain_id: ChainId, rpc: R) -> Self {
        self.routes.insert(chain_id, Arc::new(rpc));
        self
    }

    /// Routes `chain_id` to a nonblocking [`RpcClient`] at `url`.
    #[must_use]
    pub fn with_url(self, chain_id: ChainId, url: impl Into<String>) -> Self {
        self.with(chain_id, RpcClient::new(url.into()))
    }

    /// The client for `chain_id`, if configured.
    #[must_use]
    pub fn get(&self, chain_id: &ChainId) -> Option<&Arc<dyn SolanaRpc>> {
        self.routes.get(chain_id)
    }
}
