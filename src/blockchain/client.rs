//! Condenser API client with failover and timeout handling.
//!
//! # Responsibilities
//! - Define the client boundary the agent depends on ([`SteemApi`])
//! - Speak condenser JSON-RPC over HTTP
//! - Try failover endpoints on transport errors and timeouts
//! - Assemble, sign, and broadcast transactions

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::blockchain::transaction::Transaction;
use crate::blockchain::types::{
    Account, BlockchainError, BlockchainResult, BroadcastResult, Discussion, DiscussionSort,
    DynamicGlobalProperties, Operation,
};
use crate::blockchain::wallet::Wallet;
use crate::config::ApiConfig;

/// The blockchain client boundary.
///
/// The agent only ever talks to this trait; the bundled implementation is
/// [`CondenserClient`], and tests substitute scripted mocks.
#[allow(async_fn_in_trait)]
pub trait SteemApi {
    /// Fetch a single post by author and permlink.
    async fn get_content(&self, author: &str, permlink: &str) -> BlockchainResult<Discussion>;

    /// List discussions from a feed, filtered by tag, up to `limit` rows.
    async fn get_discussions(
        &self,
        sort: DiscussionSort,
        tag: &str,
        limit: u32,
    ) -> BlockchainResult<Vec<Discussion>>;

    /// Look up accounts by name.
    async fn get_accounts(&self, names: &[String]) -> BlockchainResult<Vec<Account>>;

    /// Current chain head state.
    async fn get_dynamic_global_properties(&self) -> BlockchainResult<DynamicGlobalProperties>;

    /// Sign the operations with the wallet's posting key and broadcast,
    /// waiting for inclusion.
    async fn broadcast(
        &self,
        operations: Vec<Operation>,
        wallet: &Wallet,
    ) -> BlockchainResult<BroadcastResult>;
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// Condenser JSON-RPC client (primary + failover endpoints).
#[derive(Clone)]
pub struct CondenserClient {
    /// List of endpoints (primary first).
    endpoints: Vec<Url>,
    http: reqwest::Client,
    /// Chain id prefixed to every signing digest.
    chain_id: [u8; 32],
    /// Per-call timeout duration.
    timeout_duration: Duration,
    timeout_secs: u64,
}

impl CondenserClient {
    /// Create a new client from API configuration.
    pub fn new(config: &ApiConfig) -> BlockchainResult<Self> {
        let mut endpoints = Vec::new();

        let primary: Url = config.endpoint.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid API endpoint '{}': {}", config.endpoint, e))
        })?;
        endpoints.push(primary);

        for endpoint in &config.failover_endpoints {
            if let Ok(url) = endpoint.parse() {
                endpoints.push(url);
            } else {
                tracing::warn!(endpoint = %endpoint, "Ignoring invalid failover endpoint");
            }
        }

        let mut chain_id = [0u8; 32];
        let decoded = hex::decode(&config.chain_id)
            .map_err(|e| BlockchainError::Rpc(format!("Invalid chain id: {}", e)))?;
        if decoded.len() != 32 {
            return Err(BlockchainError::Rpc(
                "Chain id must decode to 32 bytes".to_string(),
            ));
        }
        chain_id.copy_from_slice(&decoded);

        tracing::info!(
            endpoint = %config.endpoint,
            failovers = config.failover_endpoints.len(),
            "Condenser client initialized"
        );

        Ok(Self {
            endpoints,
            http: reqwest::Client::new(),
            chain_id,
            timeout_duration: Duration::from_secs(config.timeout_secs),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Issue one JSON-RPC call, trying each endpoint in turn.
    ///
    /// Transport errors and timeouts move on to the next endpoint; a remote
    /// rejection is deterministic and returned immediately.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> BlockchainResult<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let mut timed_out = false;
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            let fut = self.http.post(endpoint.clone()).json(&request).send();
            let response = match timeout(self.timeout_duration, fut).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!(endpoint_idx = i, method = method, error = %e, "RPC error, trying next endpoint");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(endpoint_idx = i, method = method, "RPC timeout, trying next endpoint");
                    timed_out = true;
                    continue;
                }
            };

            let body: RpcResponse<T> = match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(endpoint_idx = i, method = method, error = %e, "Unreadable RPC response, trying next endpoint");
                    continue;
                }
            };

            if let Some(error) = body.error {
                return Err(BlockchainError::Remote(error.message));
            }
            return body.result.ok_or_else(|| {
                BlockchainError::Malformed(format!("{}: response has no result", method))
            });
        }

        if timed_out {
            Err(BlockchainError::Timeout(self.timeout_secs))
        } else {
            Err(BlockchainError::Rpc("All API endpoints failed".to_string()))
        }
    }
}

impl SteemApi for CondenserClient {
    async fn get_content(&self, author: &str, permlink: &str) -> BlockchainResult<Discussion> {
        self.call("condenser_api.get_content", json!([author, permlink]))
            .await
    }

    async fn get_discussions(
        &self,
        sort: DiscussionSort,
        tag: &str,
        limit: u32,
    ) -> BlockchainResult<Vec<Discussion>> {
        self.call(sort.method(), json!([{ "tag": tag, "limit": limit }]))
            .await
    }

    async fn get_accounts(&self, names: &[String]) -> BlockchainResult<Vec<Account>> {
        self.call("condenser_api.get_accounts", json!([names])).await
    }

    async fn get_dynamic_global_properties(&self) -> BlockchainResult<DynamicGlobalProperties> {
        self.call("condenser_api.get_dynamic_global_properties", json!([]))
            .await
    }

    async fn broadcast(
        &self,
        operations: Vec<Operation>,
        wallet: &Wallet,
    ) -> BlockchainResult<BroadcastResult> {
        let props = self.get_dynamic_global_properties().await?;
        let signed = Transaction::prepare(&props, operations)?.sign(wallet, &self.chain_id)?;

        let result: BroadcastResult = self
            .call(
                "condenser_api.broadcast_transaction_synchronous",
                json!([signed]),
            )
            .await?;

        tracing::info!(
            tx_id = %result.id,
            block_num = ?result.block_num,
            "Transaction broadcast"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for CondenserClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CondenserClient")
            .field("endpoints", &self.endpoints.len())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
