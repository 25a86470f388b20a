//! Bridger configuration
//!
//! Loaded from environment variables (optionally from a `.env` file) and
//! passed explicitly to the scheduler and executor.
//!
//! ```text
//! FROM_NETWORK=Moonriver          # source network (registry name)
//! TO_NETWORK=Fantom               # destination network
//! MIN_AMOUNT=0.01                 # token units, used when BRIDGE_ALL_BALANCE=false
//! MAX_AMOUNT=0.04
//! DELAY_RANGE=30,60               # seconds between wallets
//! RANDOM_WALLET_ORDER=true
//! MAX_ATTEMPTS=2                  # attempts per wallet
//! BRIDGE_ALL_BALANCE=true
//! RETRY_DELAY_RANGE=5,10          # seconds between attempts
//! GAS_MULTIPLIER_RANGE=1.05,1.10  # safety factor on estimated gas
//! RECEIPT_TIMEOUT_SECS=300
//! DST_GAS=100000                  # adapter params destination gas
//! PRIVATE_KEYS_FILE=private_keys.txt
//! RNG_SEED=42                     # optional
//! ```

use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::utils::parse_ether;
use eyre::{Result, WrapErr};
use rand::Rng;

use crate::contracts::DEFAULT_DST_GAS;
use crate::endpoint::ChainSpec;
use crate::error::BridgerError;
use crate::registry;
use crate::retry::RetryPolicy;

/// Inclusive range of whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondsRange {
    pub min: u64,
    pub max: u64,
}

impl SecondsRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Parse `"min,max"`
    pub fn parse(raw: &str) -> std::result::Result<Self, BridgerError> {
        let (min, max) = split_pair(raw)?;
        let range = Self {
            min: min
                .parse()
                .map_err(|_| BridgerError::invalid_config(format!("invalid seconds: {}", min)))?,
            max: max
                .parse()
                .map_err(|_| BridgerError::invalid_config(format!("invalid seconds: {}", max)))?,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> std::result::Result<(), BridgerError> {
        if self.min > self.max {
            return Err(BridgerError::invalid_config(format!(
                "range minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, duration: Duration) -> bool {
        duration >= Duration::from_secs(self.min) && duration <= Duration::from_secs(self.max)
    }

    /// Draw a whole number of seconds uniformly from the range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min..=self.max))
    }
}

/// Inclusive range for the gas-limit safety factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasMultiplierRange {
    pub min: f64,
    pub max: f64,
}

impl Default for GasMultiplierRange {
    fn default() -> Self {
        Self {
            min: 1.05,
            max: 1.10,
        }
    }
}

impl GasMultiplierRange {
    /// Parse `"min,max"`
    pub fn parse(raw: &str) -> std::result::Result<Self, BridgerError> {
        let (min, max) = split_pair(raw)?;
        let range = Self {
            min: min
                .parse()
                .map_err(|_| BridgerError::invalid_config(format!("invalid multiplier: {}", min)))?,
            max: max
                .parse()
                .map_err(|_| BridgerError::invalid_config(format!("invalid multiplier: {}", max)))?,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> std::result::Result<(), BridgerError> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min < 1.0 || self.min > self.max
        {
            return Err(BridgerError::invalid_config(format!(
                "gas multiplier range must satisfy 1.0 <= min <= max, got {}..={}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Gas limit for `estimate`: the estimate times a random factor, rounded up
    pub fn apply<R: Rng + ?Sized>(&self, estimate: u64, rng: &mut R) -> u64 {
        let factor = rng.gen_range(self.min..=self.max);
        (estimate as f64 * factor).ceil() as u64
    }
}

/// Settings that drive the scheduler and executor
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub from_network: String,
    pub to_network: String,
    /// Lower bound of a random transfer, in smallest units
    pub min_amount: u128,
    /// Upper bound of a random transfer, in smallest units
    pub max_amount: u128,
    /// Pause after each wallet
    pub delay_range: SecondsRange,
    pub random_wallet_order: bool,
    /// Bridge the full token balance instead of a random amount
    pub transfer_entire_balance: bool,
    pub retry: RetryPolicy,
    pub gas_multiplier: GasMultiplierRange,
    /// Upper bound on waiting for a receipt after submission
    pub receipt_timeout: Duration,
    /// Gas requested for the destination-side LayerZero receive
    pub dst_gas: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            from_network: "Moonriver".to_string(),
            to_network: "Fantom".to_string(),
            min_amount: 10_000_000_000_000_000,
            max_amount: 40_000_000_000_000_000,
            delay_range: SecondsRange::new(30, 60),
            random_wallet_order: true,
            transfer_entire_balance: true,
            retry: RetryPolicy::default(),
            gas_multiplier: GasMultiplierRange::default(),
            receipt_timeout: Duration::from_secs(300),
            dst_gas: DEFAULT_DST_GAS,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> std::result::Result<(), BridgerError> {
        if self.from_network == self.to_network {
            return Err(BridgerError::invalid_config(format!(
                "source and destination are both {}",
                self.from_network
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(BridgerError::invalid_config("MAX_ATTEMPTS must be at least 1"));
        }
        if !self.transfer_entire_balance {
            if self.min_amount == 0 {
                return Err(BridgerError::invalid_config("MIN_AMOUNT must be positive"));
            }
            if self.min_amount > self.max_amount {
                return Err(BridgerError::invalid_config(
                    "MIN_AMOUNT must not exceed MAX_AMOUNT",
                ));
            }
        }
        if self.receipt_timeout.is_zero() {
            return Err(BridgerError::invalid_config(
                "RECEIPT_TIMEOUT_SECS must be positive",
            ));
        }
        self.delay_range.validate()?;
        self.retry.backoff.validate()?;
        self.gas_multiplier.validate()
    }
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bridge: BridgeConfig,
    /// Path of the private key file, one key per line
    pub keys_file: PathBuf,
    /// Seed for reproducible ordering, amounts and jitter
    pub rng_seed: Option<u64>,
    /// Networks available to the registry
    pub chains: Vec<ChainSpec>,
}

impl Config {
    /// Load configuration, reading `env_file` (or `.env` when present) first
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .wrap_err_with(|| format!("Failed to load env file {}", path.display()))?;
            }
            None => {
                if let Ok(path) = dotenvy::dotenv() {
                    tracing::debug!("Loaded .env from {:?}", path);
                }
            }
        }
        Ok(Self::from_env()?)
    }

    /// Build configuration from the process environment
    pub fn from_env() -> std::result::Result<Self, BridgerError> {
        let defaults = BridgeConfig::default();

        let min_amount = match env::var("MIN_AMOUNT") {
            Ok(raw) => parse_token_amount(&raw)?,
            Err(_) => defaults.min_amount,
        };
        let max_amount = match env::var("MAX_AMOUNT") {
            Ok(raw) => parse_token_amount(&raw)?,
            Err(_) => defaults.max_amount,
        };
        let delay_range = match env::var("DELAY_RANGE") {
            Ok(raw) => SecondsRange::parse(&raw)?,
            Err(_) => defaults.delay_range,
        };
        let backoff = match env::var("RETRY_DELAY_RANGE") {
            Ok(raw) => SecondsRange::parse(&raw)?,
            Err(_) => defaults.retry.backoff,
        };
        let gas_multiplier = match env::var("GAS_MULTIPLIER_RANGE") {
            Ok(raw) => GasMultiplierRange::parse(&raw)?,
            Err(_) => defaults.gas_multiplier,
        };

        let bridge = BridgeConfig {
            from_network: env::var("FROM_NETWORK").unwrap_or(defaults.from_network),
            to_network: env::var("TO_NETWORK").unwrap_or(defaults.to_network),
            min_amount,
            max_amount,
            delay_range,
            random_wallet_order: env_bool("RANDOM_WALLET_ORDER", defaults.random_wallet_order)?,
            transfer_entire_balance: env_bool(
                "BRIDGE_ALL_BALANCE",
                defaults.transfer_entire_balance,
            )?,
            retry: RetryPolicy {
                max_attempts: env_parse("MAX_ATTEMPTS", defaults.retry.max_attempts)?,
                backoff,
            },
            gas_multiplier,
            receipt_timeout: Duration::from_secs(env_parse(
                "RECEIPT_TIMEOUT_SECS",
                defaults.receipt_timeout.as_secs(),
            )?),
            dst_gas: env_parse("DST_GAS", defaults.dst_gas)?,
        };

        let rng_seed = match env::var("RNG_SEED") {
            Ok(raw) => Some(parse_value("RNG_SEED", &raw)?),
            Err(_) => None,
        };

        Ok(Self {
            bridge,
            keys_file: env::var("PRIVATE_KEYS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("private_keys.txt")),
            rng_seed,
            chains: registry::chain_specs_from_env()?,
        })
    }

    pub fn validate(&self) -> std::result::Result<(), BridgerError> {
        self.bridge.validate()
    }
}

/// Parse a decimal token amount (18 decimals) into smallest units
pub fn parse_token_amount(raw: &str) -> std::result::Result<u128, BridgerError> {
    let raw = raw.trim();
    if raw.starts_with('-') {
        return Err(BridgerError::invalid_config(format!(
            "token amount must not be negative: {}",
            raw
        )));
    }
    let units = parse_ether(raw)
        .map_err(|e| BridgerError::invalid_config(format!("invalid token amount {}: {}", raw, e)))?;
    u128::try_from(units)
        .map_err(|_| BridgerError::invalid_config(format!("token amount too large: {}", raw)))
}

fn split_pair(raw: &str) -> std::result::Result<(&str, &str), BridgerError> {
    raw.split_once(',')
        .map(|(a, b)| (a.trim(), b.trim()))
        .ok_or_else(|| BridgerError::invalid_config(format!("expected \"min,max\", got {}", raw)))
}

fn parse_value<T>(name: &str, raw: &str) -> std::result::Result<T, BridgerError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| BridgerError::invalid_config(format!("invalid {}: {}", name, e)))
}

fn env_parse<T>(name: &str, default: T) -> std::result::Result<T, BridgerError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> std::result::Result<bool, BridgerError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(BridgerError::invalid_config(format!(
                "invalid {}: {} (expected true/false)",
                name, other
            ))),
        },
        Err(_) => Ok(default),
    }
}
