//! Chain registry
//!
//! Maps network names to connected endpoints. Networks are plain
//! [`ChainSpec`] records; endpoint construction is a function of the record.
//!
//! # Environment Variable Schema
//!
//! ```text
//! FANTOM_RPC_URL=https://...        # override a built-in network's RPC
//! EXTRA_CHAINS_COUNT=1              # additional networks
//! EXTRA_CHAIN_1_NAME=Arbitrum
//! EXTRA_CHAIN_1_RPC_URL=https://...
//! EXTRA_CHAIN_1_EVM_CHAIN_ID=42161
//! EXTRA_CHAIN_1_BRIDGE_CHAIN_ID=110
//! EXTRA_CHAIN_1_BRIDGE_ADDRESS=0x...
//! EXTRA_CHAIN_1_TOKEN_ADDRESS=0x...
//! EXTRA_CHAIN_1_EXPLORER_URL=https://arbiscan.io
//! ```

use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::Arc;

use alloy::primitives::{address, Address};

use crate::endpoint::{ChainEndpoint, ChainSpec, EvmEndpoint};
use crate::error::BridgerError;

/// Built-in MIM OFT networks
pub fn known_chains() -> Vec<ChainSpec> {
    vec![
        ChainSpec {
            name: "Fantom".to_string(),
            rpc_url: "https://rpc.ankr.com/fantom".to_string(),
            evm_chain_id: 250,
            bridge_chain_id: 112,
            bridge_address: address!("c5c01568a3b5d8c203964049615401aaf0783191"),
            token_address: address!("82f0B8B456c1A451378467398982d4834b6829c1"),
            explorer_url: "https://ftmscan.com".to_string(),
        },
        ChainSpec {
            name: "Moonriver".to_string(),
            rpc_url: "https://rpc.api.moonriver.moonbeam.network".to_string(),
            evm_chain_id: 1285,
            bridge_chain_id: 167,
            bridge_address: address!("ef2dbdfec54c466f7ff92c9c5c75abb6794f0195"),
            token_address: address!("0caE51e1032e8461f4806e26332c030E34De3aDb"),
            explorer_url: "https://moonriver.moonscan.io".to_string(),
        },
    ]
}

/// Known networks with env RPC overrides applied, plus any `EXTRA_CHAIN_{N}_*` networks
pub fn chain_specs_from_env() -> Result<Vec<ChainSpec>, BridgerError> {
    let mut specs = known_chains();
    for spec in &mut specs {
        let var = format!("{}_RPC_URL", spec.name.to_uppercase());
        if let Ok(url) = env::var(&var) {
            tracing::debug!(network = %spec.name, "RPC overridden by {}", var);
            spec.rpc_url = url;
        }
    }

    let count: usize = match env::var("EXTRA_CHAINS_COUNT") {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BridgerError::invalid_config("EXTRA_CHAINS_COUNT must be a number"))?,
        Err(_) => 0,
    };

    for i in 1..=count {
        specs.push(extra_chain_from_env(i)?);
    }

    Ok(specs)
}

fn extra_chain_from_env(index: usize) -> Result<ChainSpec, BridgerError> {
    let prefix = format!("EXTRA_CHAIN_{}", index);
    let required = |field: &str| {
        env::var(format!("{}_{}", prefix, field))
            .map_err(|_| BridgerError::invalid_config(format!("Missing {}_{}", prefix, field)))
    };
    let address = |field: &str| -> Result<Address, BridgerError> {
        required(field)?
            .parse()
            .map_err(|_| BridgerError::invalid_config(format!("Invalid {}_{}", prefix, field)))
    };

    Ok(ChainSpec {
        name: required("NAME")?,
        rpc_url: required("RPC_URL")?,
        evm_chain_id: required("EVM_CHAIN_ID")?.parse().map_err(|_| {
            BridgerError::invalid_config(format!("Invalid {}_EVM_CHAIN_ID: must be a u64", prefix))
        })?,
        bridge_chain_id: required("BRIDGE_CHAIN_ID")?.parse().map_err(|_| {
            BridgerError::invalid_config(format!(
                "Invalid {}_BRIDGE_CHAIN_ID: must be a LayerZero u16 id",
                prefix
            ))
        })?,
        bridge_address: address("BRIDGE_ADDRESS")?,
        token_address: address("TOKEN_ADDRESS")?,
        explorer_url: required("EXPLORER_URL")?,
    })
}

/// Network name → endpoint, read-only after construction
#[derive(Clone)]
pub struct ChainRegistry {
    endpoints: HashMap<String, Arc<dyn ChainEndpoint>>,
}

impl ChainRegistry {
    /// Connect every spec. Fails on the first unreachable endpoint.
    pub async fn connect(specs: Vec<ChainSpec>) -> Result<Self, BridgerError> {
        ensure_unique_names(specs.iter().map(|s| s.name.as_str()))?;

        let mut endpoints: Vec<Arc<dyn ChainEndpoint>> = Vec::with_capacity(specs.len());
        for spec in specs {
            endpoints.push(Arc::new(EvmEndpoint::connect(spec).await?));
        }
        Self::from_endpoints(endpoints)
    }

    /// Build a registry from already-constructed endpoints
    pub fn from_endpoints(endpoints: Vec<Arc<dyn ChainEndpoint>>) -> Result<Self, BridgerError> {
        ensure_unique_names(endpoints.iter().map(|e| e.spec().name.as_str()))?;

        let endpoints = endpoints
            .into_iter()
            .map(|e| (e.spec().name.clone(), e))
            .collect();
        Ok(Self { endpoints })
    }

    /// Look up a network by exact name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ChainEndpoint>, BridgerError> {
        self.endpoints
            .get(name)
            .cloned()
            .ok_or_else(|| BridgerError::UnknownNetwork(name.to_string()))
    }

    /// Resolve source and destination together; no partial result
    pub fn select_pair(
        &self,
        from: &str,
        to: &str,
    ) -> Result<(Arc<dyn ChainEndpoint>, Arc<dyn ChainEndpoint>), BridgerError> {
        let source = self.resolve(from)?;
        let destination = self.resolve(to)?;

        let chain_id = source.spec().bridge_chain_id;
        if chain_id == destination.spec().bridge_chain_id {
            return Err(BridgerError::SameBridgeChain {
                from: from.to_string(),
                to: to.to_string(),
                chain_id,
            });
        }

        Ok((source, destination))
    }

    /// Registered network names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn ensure_unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), BridgerError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(BridgerError::DuplicateNetwork(name.to_string()));
        }
    }
    Ok(())
}
