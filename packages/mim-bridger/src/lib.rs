//! MIM Bridger - batch bridging of MIM across LayerZero OFT networks
//!
//! Moves the MIM token from one network to another through the Abracadabra
//! OFT bridge for every wallet in a private-key file, one wallet at a time.
//!
//! - **Registry** - network name → connected [`endpoint::ChainEndpoint`]
//! - **Executor** - per-wallet fee estimation, signing, submission and retry
//! - **Scheduler** - wallet ordering, inter-wallet jitter, batch summary
//!
//! The binary (`mim-bridger`) wires these together from environment
//! configuration; the library is exposed for integration tests.

pub mod config;
pub mod contracts;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod keys;
pub mod redact;
pub mod registry;
pub mod retry;
pub mod scheduler;

pub use config::{BridgeConfig, Config, GasMultiplierRange, SecondsRange};
pub use endpoint::{ChainEndpoint, ChainSpec, EvmEndpoint, ReceiptStatus};
pub use error::BridgerError;
pub use executor::{execute_transfer, TransferOutcome, TransferRequest};
pub use keys::{load_keys, parse_keys, SigningKey};
pub use registry::{known_chains, ChainRegistry};
pub use scheduler::{run_batch, wallet_order, BatchSummary, WalletReport};
