//! Transaction submission against a single network.
//!
//! Signing is delegated to the node (or a signing proxy in front of it): the
//! deployer account must be unlocked for `eth_sendTransaction`.

use std::future::Future;
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U64, U256};
use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::rpc;

/// The subset of a transaction receipt the deployment flow cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    /// `0x1` on success, `0x0` on revert. Pre-Byzantium receipts have none.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U256>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status != Some(U64::ZERO)
    }
}

/// Issues transactions and read-only calls from one account on one network.
///
/// All calls of a task go through the same transactor, in program order, so
/// the account nonce advances sequentially.
pub trait Transactor: Send + Sync {
    /// The account transactions are sent from.
    fn sender(&self) -> Address;

    /// Send a transaction and wait for a successful receipt.
    ///
    /// A reverted transaction is an error.
    fn send_transaction(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> impl Future<Output = Result<TxReceipt>> + Send;

    /// Execute a read-only call against the latest block.
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = Result<Bytes>> + Send;
}

/// JSON-RPC backed [`Transactor`].
#[derive(Debug, Clone)]
pub struct ChainClient {
    client: reqwest::Client,
    url: Url,
    from: Address,
    chain_id: u64,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

/// Timing knobs for [`ChainClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTimeouts {
    /// Bound on every single HTTP request.
    pub request: Duration,
    /// Bound on waiting for a transaction receipt.
    pub receipt: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl Default for ChainTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            receipt: Duration::from_secs(180),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl ChainClient {
    /// Connect to `url`, checking the chain id and resolving the deployer account.
    ///
    /// When `deployer` is `None` the first account exposed by the node is used;
    /// a node exposing no account is a fatal error.
    pub async fn connect(
        url: Url,
        expected_chain_id: u64,
        deployer: Option<Address>,
        timeouts: ChainTimeouts,
    ) -> Result<Self> {
        let client = rpc::create_client(timeouts.request)?;

        let chain_id: U64 = rpc::json_rpc_call(&client, url.as_str(), "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to query chain id from {}", url))?;
        let chain_id = chain_id.to::<u64>();
        if chain_id != expected_chain_id {
            anyhow::bail!(
                "Chain id mismatch for {}: expected {}, node reports {}",
                url,
                expected_chain_id,
                chain_id
            );
        }

        let from = match deployer {
            Some(address) => address,
            None => {
                let accounts: Vec<Address> =
                    rpc::json_rpc_call(&client, url.as_str(), "eth_accounts", vec![])
                        .await
                        .context("Failed to query node accounts")?;
                accounts
                    .first()
                    .copied()
                    .context("Missing named deployer account: node exposes no accounts")?
            }
        };

        Ok(Self {
            client,
            url,
            from,
            chain_id,
            receipt_timeout: timeouts.receipt,
            poll_interval: timeouts.poll_interval,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        let client = self.client.clone();
        let url = self.url.to_string();

        rpc::poll_until(
            &format!("receipt of {}", tx_hash),
            self.receipt_timeout,
            self.poll_interval,
            || {
                let client = client.clone();
                let url = url.clone();
                async move {
                    rpc::json_rpc_call::<Option<TxReceipt>>(
                        &client,
                        &url,
                        "eth_getTransactionReceipt",
                        vec![serde_json::json!(tx_hash)],
                    )
                    .await
                }
            },
        )
        .await
    }
}

impl Transactor for ChainClient {
    fn sender(&self) -> Address {
        self.from
    }

    async fn send_transaction(&self, to: Address, data: Bytes, value: U256) -> Result<TxReceipt> {
        let tx_hash: B256 = rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_sendTransaction",
            vec![serde_json::json!({
                "from": self.from,
                "to": to,
                "data": data,
                "value": format!("0x{:x}", value),
            })],
        )
        .await
        .with_context(|| format!("Failed to send transaction to {}", to))?;

        tracing::debug!(tx_hash = %tx_hash, to = %to, "Transaction sent, waiting for receipt");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.succeeded() {
            anyhow::bail!("Transaction {} to {} reverted", tx_hash, to);
        }

        tracing::debug!(
            tx_hash = %tx_hash,
            block = ?receipt.block_number,
            gas_used = ?receipt.gas_used,
            "Transaction confirmed"
        );

        Ok(receipt)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_call",
            vec![
                serde_json::json!({ "from": self.from, "to": to, "data": data }),
                serde_json::json!("latest"),
            ],
        )
        .await
        .with_context(|| format!("eth_call to {} failed", to))
    }
}
