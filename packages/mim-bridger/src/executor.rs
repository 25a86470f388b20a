//! Transfer executor - bridges one wallet's MIM with bounded retries
//!
//! Per wallet the amount is fixed once (full balance or a random draw), then
//! each attempt re-reads nonce and gas price, quotes the LayerZero fee, builds
//! and signs a `sendFrom` transaction, submits it and waits for the receipt.
//! Failures never escape this module: they end up in [`TransferOutcome`].
//!
//! A submission whose receipt was not seen stays pending. Pending hashes are
//! re-checked before every further attempt and before giving up, so a late
//! mined transaction ends the wallet as `Success` instead of being sent again.

use std::fmt;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use eyre::Result;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::contracts::{adapter_params, address_to_bytes32, MimBridge};
use crate::endpoint::{ChainEndpoint, ChainSpec, ReceiptStatus};
use crate::keys::SigningKey;
use crate::retry::{classify_error, ErrorClass, RetryPolicy};

/// `useZro` flag passed to estimateSendFee; only the native fee is consumed
const USE_ZRO: bool = true;

/// One wallet's transfer, consumed by [`execute_transfer`]
pub struct TransferRequest<'a> {
    pub source: &'a dyn ChainEndpoint,
    pub destination: &'a dyn ChainEndpoint,
    pub key: &'a SigningKey,
    /// Attempts allowed for this wallet (at least 1)
    pub max_attempts: u32,
    pub transfer_entire_balance: bool,
}

/// Result of bridging one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Bridge transaction mined successfully
    Success { tx_hash: TxHash, amount: U256 },
    /// Every attempt failed
    ExhaustedRetries {
        attempts: u32,
        last_error: String,
        /// Submitted transactions still without a receipt
        #[serde(skip_serializing_if = "Vec::is_empty")]
        unconfirmed: Vec<TxHash>,
    },
    /// Nothing was attempted (balance unreadable or zero)
    Aborted { reason: String },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Success { tx_hash, amount } => {
                write!(f, "bridged {} MIM in {}", format_ether(*amount), tx_hash)
            }
            TransferOutcome::ExhaustedRetries {
                attempts,
                last_error,
                unconfirmed,
            } => {
                write!(f, "failed after {} attempts: {}", attempts, last_error)?;
                if !unconfirmed.is_empty() {
                    write!(f, " ({} unconfirmed)", unconfirmed.len())?;
                }
                Ok(())
            }
            TransferOutcome::Aborted { reason } => write!(f, "aborted: {}", reason),
        }
    }
}

/// Why a single attempt failed
#[derive(Debug, Error)]
enum AttemptError {
    #[error("transaction {0} mined but reverted")]
    Reverted(TxHash),

    #[error("receipt for {tx_hash} not received within {timeout:?}")]
    ReceiptTimeout { tx_hash: TxHash, timeout: Duration },

    #[error("{0:#}")]
    Chain(eyre::Report),
}

impl AttemptError {
    fn class(&self) -> ErrorClass {
        match self {
            AttemptError::Reverted(_) => ErrorClass::Permanent,
            AttemptError::ReceiptTimeout { .. } => ErrorClass::Transient,
            AttemptError::Chain(e) => classify_error(&format!("{:#}", e)),
        }
    }
}

/// Values fixed for every attempt of one wallet
#[derive(Debug, Clone)]
struct BridgePlan {
    sender: Address,
    recipient: FixedBytes<32>,
    amount: U256,
    adapter_params: Bytes,
    dst_chain_id: u16,
}

/// Bridge one wallet's MIM, retrying up to `request.max_attempts` times
pub async fn execute_transfer<R: Rng + ?Sized>(
    request: TransferRequest<'_>,
    config: &BridgeConfig,
    rng: &mut R,
) -> TransferOutcome {
    let source = request.source;
    let sender = request.key.address();

    let amount = match choose_amount(
        source,
        sender,
        request.transfer_entire_balance,
        config,
        rng,
    )
    .await
    {
        Ok(amount) => amount,
        Err(e) => {
            error!(wallet = %sender, network = %source.spec().name, error = %e, "Failed to read token balance");
            return TransferOutcome::Aborted {
                reason: format!("balance query failed: {:#}", e),
            };
        }
    };

    if amount.is_zero() {
        warn!(wallet = %sender, network = %source.spec().name, "No MIM to bridge");
        return TransferOutcome::Aborted {
            reason: "token balance is zero".to_string(),
        };
    }

    let plan = BridgePlan {
        sender,
        recipient: address_to_bytes32(sender),
        amount,
        adapter_params: adapter_params(config.dst_gas, sender),
        dst_chain_id: request.destination.spec().bridge_chain_id,
    };

    let policy = RetryPolicy {
        max_attempts: request.max_attempts,
        backoff: config.retry.backoff,
    };

    info!(
        wallet = %sender,
        from = %source.spec().name,
        to = %request.destination.spec().name,
        amount = %format_ether(amount),
        "Starting bridge"
    );

    let mut last_error = String::new();
    let mut pending: Vec<TxHash> = Vec::new();
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            if let Some(tx_hash) = settle_pending(source, &mut pending).await {
                return confirmed(source.spec(), &plan, attempt - 1, tx_hash);
            }
        }

        match attempt_transfer(source, request.key, &plan, config, rng, &mut pending).await {
            Ok(tx_hash) => return confirmed(source.spec(), &plan, attempt, tx_hash),
            Err(e) => {
                error!(
                    wallet = %sender,
                    attempt,
                    max_attempts = policy.max_attempts,
                    class = e.class().as_str(),
                    error = %e,
                    "Bridge attempt failed"
                );
                last_error = e.to_string();
            }
        }

        if policy.should_retry(attempt) {
            let backoff = policy.sample_backoff(rng);
            warn!(
                attempt,
                backoff_secs = backoff.as_secs(),
                "Retrying after backoff"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    if let Some(tx_hash) = settle_pending(source, &mut pending).await {
        return confirmed(source.spec(), &plan, policy.max_attempts, tx_hash);
    }

    error!(
        wallet = %sender,
        attempts = policy.max_attempts,
        unconfirmed = pending.len(),
        "Reached maximum number of attempts"
    );
    TransferOutcome::ExhaustedRetries {
        attempts: policy.max_attempts,
        last_error,
        unconfirmed: pending,
    }
}

fn confirmed(spec: &ChainSpec, plan: &BridgePlan, attempt: u32, tx_hash: TxHash) -> TransferOutcome {
    info!(
        network = %spec.name,
        wallet = %plan.sender,
        token_amount = %format_ether(plan.amount),
        attempt,
        tx = %spec.tx_url(&tx_hash),
        "Bridge tx confirmed"
    );
    TransferOutcome::Success {
        tx_hash,
        amount: plan.amount,
    }
}

/// Poll every pending hash once. Returns the first one mined successfully;
/// reverted ones are dropped and unmined ones kept.
async fn settle_pending(source: &dyn ChainEndpoint, pending: &mut Vec<TxHash>) -> Option<TxHash> {
    let mut still_pending = Vec::with_capacity(pending.len());
    for tx_hash in pending.drain(..) {
        match source.receipt(tx_hash).await {
            Ok(Some(ReceiptStatus::Success)) => {
                info!(tx_hash = %tx_hash, "Earlier submission was mined");
                return Some(tx_hash);
            }
            Ok(Some(ReceiptStatus::Reverted)) => {
                warn!(tx_hash = %tx_hash, "Earlier submission mined but reverted");
            }
            Ok(None) => still_pending.push(tx_hash),
            Err(e) => {
                warn!(tx_hash = %tx_hash, error = %e, "Failed to check earlier submission");
                still_pending.push(tx_hash);
            }
        }
    }
    *pending = still_pending;
    None
}

/// Amount for the whole request: the full balance or a uniform draw in `[min, max]`
async fn choose_amount<R: Rng + ?Sized>(
    source: &dyn ChainEndpoint,
    owner: Address,
    entire_balance: bool,
    config: &BridgeConfig,
    rng: &mut R,
) -> Result<U256> {
    if entire_balance {
        return source.token_balance(owner).await;
    }
    Ok(U256::from(
        rng.gen_range(config.min_amount..=config.max_amount),
    ))
}

async fn attempt_transfer<R: Rng + ?Sized>(
    source: &dyn ChainEndpoint,
    key: &SigningKey,
    plan: &BridgePlan,
    config: &BridgeConfig,
    rng: &mut R,
    pending: &mut Vec<TxHash>,
) -> std::result::Result<TxHash, AttemptError> {
    let nonce = source.nonce(plan.sender).await.map_err(AttemptError::Chain)?;
    let gas_price = source.gas_price().await.map_err(AttemptError::Chain)?;

    let fee = source
        .estimate_send_fee(
            plan.dst_chain_id,
            plan.recipient,
            plan.amount,
            USE_ZRO,
            plan.adapter_params.clone(),
        )
        .await
        .map_err(AttemptError::Chain)?;

    let tx = build_send_tx(source.spec(), plan, fee, gas_price, nonce);
    let estimate = source.estimate_gas(&tx).await.map_err(AttemptError::Chain)?;
    let gas_limit = config.gas_multiplier.apply(estimate, rng);

    debug!(
        nonce,
        gas_price,
        fee = %fee,
        gas_estimate = estimate,
        gas_limit,
        "Submitting sendFrom"
    );

    let tx_hash = source
        .submit(key.signer(), tx.with_gas_limit(gas_limit))
        .await
        .map_err(AttemptError::Chain)?;
    info!(tx_hash = %tx_hash, "Transaction sent, waiting for receipt");
    pending.push(tx_hash);

    let status = tokio::time::timeout(config.receipt_timeout, source.wait_for_receipt(tx_hash))
        .await
        .map_err(|_| AttemptError::ReceiptTimeout {
            tx_hash,
            timeout: config.receipt_timeout,
        })?
        .map_err(AttemptError::Chain)?;
    pending.retain(|h| *h != tx_hash);

    match status {
        ReceiptStatus::Success => Ok(tx_hash),
        ReceiptStatus::Reverted => Err(AttemptError::Reverted(tx_hash)),
    }
}

/// Unsigned legacy `sendFrom` transaction without a gas limit
fn build_send_tx(
    spec: &ChainSpec,
    plan: &BridgePlan,
    fee: U256,
    gas_price: u128,
    nonce: u64,
) -> TransactionRequest {
    let call = MimBridge::sendFromCall {
        from: plan.sender,
        dstChainId: plan.dst_chain_id,
        toAddress: plan.recipient,
        amount: plan.amount,
        callParams: MimBridge::LzCallParams {
            refundAddress: plan.sender,
            zroPaymentAddress: Address::ZERO,
            adapterParams: plan.adapter_params.clone(),
        },
    };

    TransactionRequest::default()
        .with_from(plan.sender)
        .with_to(spec.bridge_address)
        .with_input(call.abi_encode())
        .with_value(fee)
        .with_gas_price(gas_price)
        .with_nonce(nonce)
        .with_chain_id(spec.evm_chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::known_chains;
    use alloy::primitives::address;

    fn plan() -> BridgePlan {
        let sender = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        BridgePlan {
            sender,
            recipient: address_to_bytes32(sender),
            amount: U256::from(123u64),
            adapter_params: adapter_params(100_000, sender),
            dst_chain_id: 112,
        }
    }

    #[test]
    fn test_build_send_tx_fields() {
        let spec = known_chains()
            .into_iter()
            .find(|c| c.name == "Moonriver")
            .unwrap();
        let plan = plan();

        let tx = build_send_tx(&spec, &plan, U256::from(7u64), 1_000_000_000, 9);

        assert_eq!(tx.from, Some(plan.sender));
        assert_eq!(tx.value, Some(U256::from(7u64)));
        assert_eq!(tx.gas_price, Some(1_000_000_000));
        assert_eq!(tx.nonce, Some(9));
        assert_eq!(tx.chain_id, Some(1285));
        assert_eq!(tx.gas, None);

        let input = tx.input.input().unwrap();
        let decoded = MimBridge::sendFromCall::abi_decode(input, true).unwrap();
        assert_eq!(decoded.from, plan.sender);
        assert_eq!(decoded.dstChainId, 112);
        assert_eq!(decoded.toAddress, plan.recipient);
        assert_eq!(decoded.amount, U256::from(123u64));
        assert_eq!(decoded.callParams.zroPaymentAddress, Address::ZERO);
        assert_eq!(decoded.callParams.adapterParams, plan.adapter_params);
    }

    #[test]
    fn test_attempt_error_classes() {
        let hash = TxHash::ZERO;
        assert_eq!(AttemptError::Reverted(hash).class(), ErrorClass::Permanent);
        assert_eq!(
            AttemptError::ReceiptTimeout {
                tx_hash: hash,
                timeout: Duration::from_secs(1)
            }
            .class(),
            ErrorClass::Transient
        );
        assert_eq!(
            AttemptError::Chain(eyre::eyre!("nonce too low")).class(),
            ErrorClass::NonceTooLow
        );
    }

    #[test]
    fn test_outcome_display() {
        let success = TransferOutcome::Success {
            tx_hash: TxHash::ZERO,
            amount: U256::from(1_500_000_000_000_000_000u128),
        };
        assert!(success.to_string().starts_with("bridged 1.5"));
        assert!(success.is_success());

        let exhausted = TransferOutcome::ExhaustedRetries {
            attempts: 2,
            last_error: "boom".to_string(),
            unconfirmed: vec![],
        };
        assert_eq!(exhausted.to_string(), "failed after 2 attempts: boom");
        assert!(!exhausted.is_success());

        let in_flight = TransferOutcome::ExhaustedRetries {
            attempts: 2,
            last_error: "boom".to_string(),
            unconfirmed: vec![TxHash::ZERO],
        };
        assert_eq!(
            in_flight.to_string(),
            "failed after 2 attempts: boom (1 unconfirmed)"
        );
    }

    #[test]
    fn test_unconfirmed_omitted_from_json_when_empty() {
        let exhausted = TransferOutcome::ExhaustedRetries {
            attempts: 1,
            last_error: "boom".to_string(),
            unconfirmed: vec![],
        };
        let json = serde_json::to_value(&exhausted).unwrap();
        assert_eq!(json["status"], "exhausted_retries");
        assert!(json.get("unconfirmed").is_none());
    }
}
