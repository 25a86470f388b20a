//! Chain endpoints
//!
//! A [`ChainSpec`] is the immutable description of one network (RPC, bridge
//! and token addresses, LayerZero chain id, explorer). [`EvmEndpoint`] is the
//! connected form of a spec; the executor only sees the [`ChainEndpoint`]
//! trait so it can be driven against a mock in tests.
//!
//! # Transaction Building
//!
//! Transactions are built by the executor with explicit nonce, gas price and
//! gas limit, signed locally with the wallet key and submitted raw. No alloy
//! fillers are installed on the provider.

use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tracing::{debug, info, warn};

use crate::contracts::{MimBridge, ERC20};
use crate::error::BridgerError;

/// Interval between receipt polls while a transaction is pending
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Static description of one bridge network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    /// Registry name (e.g. "Fantom")
    pub name: String,
    /// HTTP JSON-RPC endpoint
    pub rpc_url: String,
    /// Native EVM chain ID, used for EIP-155 signing
    pub evm_chain_id: u64,
    /// LayerZero chain ID of this network
    pub bridge_chain_id: u16,
    /// MIM OFT bridge contract
    pub bridge_address: Address,
    /// MIM token contract
    pub token_address: Address,
    /// Block explorer base URL, without trailing slash
    pub explorer_url: String,
}

impl ChainSpec {
    /// Explorer link for a transaction on this network
    pub fn tx_url(&self, tx_hash: &TxHash) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

/// Final status of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

impl From<bool> for ReceiptStatus {
    fn from(status: bool) -> Self {
        if status {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Reverted
        }
    }
}

/// Read/write access to one network's bridge and token contracts
#[async_trait]
pub trait ChainEndpoint: Send + Sync {
    /// Static description of the network
    fn spec(&self) -> &ChainSpec;

    /// MIM balance of `owner` in smallest units
    async fn token_balance(&self, owner: Address) -> Result<U256>;

    /// Transaction count of `owner`
    async fn nonce(&self, owner: Address) -> Result<u64>;

    /// Current legacy gas price in wei
    async fn gas_price(&self) -> Result<u128>;

    /// Native messaging fee quoted by the bridge for a send
    async fn estimate_send_fee(
        &self,
        dst_chain_id: u16,
        to_address: FixedBytes<32>,
        amount: U256,
        use_zro: bool,
        adapter_params: Bytes,
    ) -> Result<U256>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64>;

    /// Sign `tx` with `signer` and broadcast it, returning its hash
    async fn submit(&self, signer: &PrivateKeySigner, tx: TransactionRequest) -> Result<TxHash>;

    /// Receipt status of `tx_hash`, or `None` while it is not mined
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>>;

    /// Wait until `tx_hash` is mined. Unbounded; callers apply their own timeout.
    ///
    /// Failed polls are logged and retried on the next tick.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus> {
        loop {
            match self.receipt(tx_hash).await {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        network = %self.spec().name,
                        tx_hash = %tx_hash,
                        error = %e,
                        "Receipt poll failed"
                    );
                }
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

/// JSON-RPC backed endpoint
pub struct EvmEndpoint {
    spec: ChainSpec,
    provider: RootProvider<Http<Client>>,
}

impl EvmEndpoint {
    /// Connect to the network's RPC and check it serves the expected chain.
    ///
    /// Any failure here is fatal for the run and is not retried.
    pub async fn connect(spec: ChainSpec) -> std::result::Result<Self, BridgerError> {
        let unreachable = |reason: String| BridgerError::EndpointUnreachable {
            network: spec.name.clone(),
            reason,
        };

        let url: url::Url = spec
            .rpc_url
            .parse()
            .map_err(|e| unreachable(format!("invalid RPC URL {}: {}", spec.rpc_url, e)))?;
        let provider = ProviderBuilder::new().on_http(url);

        let reported = provider
            .get_chain_id()
            .await
            .map_err(|e| unreachable(format!("eth_chainId failed: {}", e)))?;
        if reported != spec.evm_chain_id {
            return Err(unreachable(format!(
                "RPC serves chain {} but {} expects {}",
                reported, spec.name, spec.evm_chain_id
            )));
        }

        info!(
            network = %spec.name,
            evm_chain_id = spec.evm_chain_id,
            bridge_chain_id = spec.bridge_chain_id,
            bridge = %spec.bridge_address,
            "Endpoint connected"
        );

        Ok(Self { spec, provider })
    }
}

#[async_trait]
impl ChainEndpoint for EvmEndpoint {
    fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        let token = ERC20::new(self.spec.token_address, &self.provider);
        let balance = token
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get token balance: {}", e))?;
        Ok(balance._0)
    }

    async fn nonce(&self, owner: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(owner)
            .await
            .wrap_err("Failed to get nonce")
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .wrap_err("Failed to get gas price")
    }

    async fn estimate_send_fee(
        &self,
        dst_chain_id: u16,
        to_address: FixedBytes<32>,
        amount: U256,
        use_zro: bool,
        adapter_params: Bytes,
    ) -> Result<U256> {
        let bridge = MimBridge::new(self.spec.bridge_address, &self.provider);
        let fees = bridge
            .estimateSendFee(dst_chain_id, to_address, amount, use_zro, adapter_params)
            .call()
            .await
            .map_err(|e| eyre!("estimateSendFee failed: {}", e))?;
        Ok(fees.nativeFee)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        self.provider
            .estimate_gas(tx)
            .await
            .wrap_err("Failed to estimate gas")
    }

    async fn submit(&self, signer: &PrivateKeySigner, tx: TransactionRequest) -> Result<TxHash> {
        let wallet = EthereumWallet::from(signer.clone());
        let envelope = tx
            .build(&wallet)
            .await
            .map_err(|e| eyre!("Failed to sign transaction: {}", e))?;

        let pending = self
            .provider
            .send_raw_transaction(&envelope.encoded_2718())
            .await
            .map_err(|e| eyre!("Failed to send transaction: {}", e))?;

        let tx_hash = *pending.tx_hash();
        debug!(network = %self.spec.name, tx_hash = %tx_hash, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .wrap_err("Failed to get transaction receipt")?;
        Ok(receipt.map(|r| r.status().into()))
    }
}
