//! Scripted in-memory chain endpoint shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{address, Address, Bytes, FixedBytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use mim_bridger::contracts::MimBridge;
use mim_bridger::{ChainEndpoint, ChainSpec, ReceiptStatus, SigningKey};
use tokio::time::Instant;

/// Anvil's well-known dev keys
pub const KEYS: [&str; 3] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
];

pub const GAS_ESTIMATE: u64 = 100_000;

pub fn keys(n: usize) -> Vec<SigningKey> {
    KEYS[..n]
        .iter()
        .map(|k| SigningKey::parse(k).unwrap())
        .collect()
}

pub fn fantom_spec() -> ChainSpec {
    ChainSpec {
        name: "Fantom".to_string(),
        rpc_url: "http://localhost:8545".to_string(),
        evm_chain_id: 250,
        bridge_chain_id: 112,
        bridge_address: address!("c5c01568a3b5d8c203964049615401aaf0783191"),
        token_address: address!("82f0B8B456c1A451378467398982d4834b6829c1"),
        explorer_url: "https://ftmscan.com".to_string(),
    }
}

pub fn moonriver_spec() -> ChainSpec {
    ChainSpec {
        name: "Moonriver".to_string(),
        rpc_url: "http://localhost:8546".to_string(),
        evm_chain_id: 1285,
        bridge_chain_id: 167,
        bridge_address: address!("ef2dbdfec54c466f7ff92c9c5c75abb6794f0195"),
        token_address: address!("0caE51e1032e8461f4806e26332c030E34De3aDb"),
        explorer_url: "https://moonriver.moonscan.io".to_string(),
    }
}

/// What happens to the next submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Broadcast and mined successfully
    Mined,
    /// Broadcast and mined successfully once this long has passed
    MinedAfter(Duration),
    /// Broadcast and mined with status 0
    Reverted,
    /// Rejected at broadcast
    SubmitError,
    /// Broadcast but never mined
    NeverMined,
}

/// Everything the executor asked of the endpoint
#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub balance_reads: usize,
    pub nonce_reads: usize,
    pub gas_price_reads: usize,
    /// (dst chain id, amount) per fee quote
    pub fee_quotes: Vec<(u16, U256)>,
    pub gas_estimates: usize,
    pub receipt_polls: usize,
    /// Transactions handed to `submit`, successful or not
    pub submitted: Vec<TransactionRequest>,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.balance_reads
            + self.nonce_reads
            + self.gas_price_reads
            + self.fee_quotes.len()
            + self.gas_estimates
            + self.receipt_polls
            + self.submitted.len()
    }

    /// `sendFrom` amounts of every submitted transaction
    pub fn submitted_amounts(&self) -> Vec<U256> {
        self.submitted.iter().map(|tx| decode_send(tx).amount).collect()
    }

    /// Senders of submitted transactions, in order
    pub fn submitted_senders(&self) -> Vec<Address> {
        self.submitted.iter().map(|tx| decode_send(tx).from).collect()
    }
}

pub fn decode_send(tx: &TransactionRequest) -> MimBridge::sendFromCall {
    let input = tx.input.input().expect("tx has calldata");
    MimBridge::sendFromCall::abi_decode(input, true).expect("sendFrom calldata")
}

pub struct MockEndpoint {
    spec: ChainSpec,
    /// `None` makes balance reads fail
    default_balance: Option<U256>,
    balances: HashMap<Address, U256>,
    script: Mutex<VecDeque<Submission>>,
    /// Used once the script runs out
    fallback: Submission,
    pending: Mutex<HashMap<TxHash, (Submission, Instant)>>,
    /// Receipt polls that fail before polling succeeds
    failing_polls: Mutex<usize>,
    calls: Mutex<Calls>,
}

impl MockEndpoint {
    pub fn new(spec: ChainSpec) -> Self {
        Self {
            spec,
            default_balance: Some(U256::ZERO),
            balances: HashMap::new(),
            script: Mutex::new(VecDeque::new()),
            fallback: Submission::Mined,
            pending: Mutex::new(HashMap::new()),
            failing_polls: Mutex::new(0),
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn with_balance(mut self, balance: U256) -> Self {
        self.default_balance = Some(balance);
        self
    }

    pub fn with_balance_of(mut self, owner: Address, balance: U256) -> Self {
        self.balances.insert(owner, balance);
        self
    }

    pub fn with_failing_balance(mut self) -> Self {
        self.default_balance = None;
        self
    }

    pub fn with_script(self, script: impl IntoIterator<Item = Submission>) -> Self {
        *self.script.lock().unwrap() = script.into_iter().collect();
        self
    }

    pub fn with_fallback(mut self, fallback: Submission) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_failing_polls(self, count: usize) -> Self {
        *self.failing_polls.lock().unwrap() = count;
        self
    }

    /// Submitted transactions that have mined successfully by now
    pub fn mined_count(&self) -> usize {
        let now = Instant::now();
        self.pending
            .lock()
            .unwrap()
            .values()
            .filter(|(outcome, at)| match outcome {
                Submission::Mined => true,
                Submission::MinedAfter(delay) => now >= *at + *delay,
                _ => false,
            })
            .count()
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainEndpoint for MockEndpoint {
    fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        self.calls.lock().unwrap().balance_reads += 1;
        if let Some(balance) = self.balances.get(&owner) {
            return Ok(*balance);
        }
        self.default_balance
            .ok_or_else(|| eyre!("Failed to get token balance: connection refused"))
    }

    async fn nonce(&self, _owner: Address) -> Result<u64> {
        let mut calls = self.calls.lock().unwrap();
        calls.nonce_reads += 1;
        Ok(calls.submitted.len() as u64)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.calls.lock().unwrap().gas_price_reads += 1;
        Ok(1_000_000_000)
    }

    async fn estimate_send_fee(
        &self,
        dst_chain_id: u16,
        _to_address: FixedBytes<32>,
        amount: U256,
        _use_zro: bool,
        _adapter_params: Bytes,
    ) -> Result<U256> {
        self.calls
            .lock()
            .unwrap()
            .fee_quotes
            .push((dst_chain_id, amount));
        Ok(U256::from(1_000_000_000_000_000u64))
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64> {
        self.calls.lock().unwrap().gas_estimates += 1;
        Ok(GAS_ESTIMATE)
    }

    async fn submit(&self, _signer: &PrivateKeySigner, tx: TransactionRequest) -> Result<TxHash> {
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        let mut calls = self.calls.lock().unwrap();
        calls.submitted.push(tx);
        if outcome == Submission::SubmitError {
            return Err(eyre!("Failed to send transaction: nonce too low"));
        }

        let tx_hash = TxHash::with_last_byte(calls.submitted.len() as u8);
        self.pending
            .lock()
            .unwrap()
            .insert(tx_hash, (outcome, Instant::now()));
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>> {
        self.calls.lock().unwrap().receipt_polls += 1;
        {
            let mut failing = self.failing_polls.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(eyre!("Failed to get transaction receipt: 502 Bad Gateway"));
            }
        }

        let entry = self.pending.lock().unwrap().get(&tx_hash).copied();
        match entry {
            Some((Submission::Mined, _)) => Ok(Some(ReceiptStatus::Success)),
            Some((Submission::MinedAfter(delay), at)) if Instant::now() >= at + delay => {
                Ok(Some(ReceiptStatus::Success))
            }
            Some((Submission::Reverted, _)) => Ok(Some(ReceiptStatus::Reverted)),
            Some(_) => Ok(None),
            None => Err(eyre!("unknown transaction {}", tx_hash)),
        }
    }
}
