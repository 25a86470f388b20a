//! Batch scheduler
//!
//! Runs the executor over every wallet sequentially, optionally in shuffled
//! order, pausing a random delay after each wallet. One wallet's failure
//! never stops the batch.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use alloy::primitives::Address;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::config::BridgeConfig;
use crate::endpoint::ChainEndpoint;
use crate::executor::{execute_transfer, TransferOutcome, TransferRequest};
use crate::keys::SigningKey;

/// Outcome of one wallet within a batch
#[derive(Debug, Clone, Serialize)]
pub struct WalletReport {
    /// Position of the key in the loaded key list
    pub index: usize,
    pub address: Address,
    pub outcome: TransferOutcome,
    /// Pause taken after this wallet
    #[serde(with = "duration_secs")]
    pub delay: Duration,
}

/// Per-wallet reports in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<WalletReport>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }
}

/// Processing order over `len` wallets: identity, or a uniform permutation
pub fn wallet_order<R: Rng + ?Sized>(len: usize, shuffle: bool, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if shuffle {
        order.shuffle(rng);
    }
    order
}

/// Bridge every wallet once, in configured order
pub async fn run_batch<R: Rng + ?Sized>(
    keys: &[SigningKey],
    source: &dyn ChainEndpoint,
    destination: &dyn ChainEndpoint,
    config: &BridgeConfig,
    rng: &mut R,
) -> BatchSummary {
    let order = wallet_order(keys.len(), config.random_wallet_order, rng);
    let total = order.len();
    let mut summary = BatchSummary {
        reports: Vec::with_capacity(total),
    };

    info!(
        wallets = total,
        from = %source.spec().name,
        to = %destination.spec().name,
        shuffled = config.random_wallet_order,
        "Starting batch"
    );

    for (position, &index) in order.iter().enumerate() {
        let key = &keys[index];
        info!(
            "[{}/{}] Processing wallet {}",
            position + 1,
            total,
            key.address()
        );

        let request = TransferRequest {
            source,
            destination,
            key,
            max_attempts: config.retry.max_attempts,
            transfer_entire_balance: config.transfer_entire_balance,
        };
        let outcome = execute_transfer(request, config, rng).await;
        info!(wallet = %key.address(), "{}", outcome);

        let delay = config.delay_range.sample(rng);
        info!(delay_secs = delay.as_secs(), "Sleeping before next wallet");
        pause(delay).await;

        summary.reports.push(WalletReport {
            index,
            address: key.address(),
            outcome,
            delay,
        });
    }

    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "Batch finished"
    );
    summary
}

/// Sleep for `delay`, drawing a countdown on stderr when it is a terminal
async fn pause(delay: Duration) {
    let mut stderr = std::io::stderr();
    if !stderr.is_terminal() {
        tokio::time::sleep(delay).await;
        return;
    }

    let mut remaining = delay.as_secs();
    while remaining > 0 {
        let _ = write!(stderr, "\rNext wallet in {:>4}s", remaining);
        let _ = stderr.flush();
        tokio::time::sleep(Duration::from_secs(1)).await;
        remaining -= 1;
    }
    let _ = write!(stderr, "\r{:24}\r", "");
    let _ = stderr.flush();
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }
}
