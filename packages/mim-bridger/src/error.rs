//! Error types for the bridger
//!
//! Only configuration, registry and key-loading failures are represented
//! here; they abort the run before any transaction is sent. Per-attempt chain
//! errors stay inside the executor as `eyre::Report`s.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgerError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Duplicate network name: {0}")]
    DuplicateNetwork(String),

    #[error("{from} and {to} share bridge chain id {chain_id}")]
    SameBridgeChain {
        from: String,
        to: String,
        chain_id: u16,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Endpoint Errors
    // ========================================================================
    #[error("Endpoint {network} unreachable: {reason}")]
    EndpointUnreachable { network: String, reason: String },

    // ========================================================================
    // Key Material Errors
    // ========================================================================
    #[error("Invalid private key on line {line}")]
    InvalidKey { line: usize },

    #[error("No private keys found")]
    NoKeys,
}

impl BridgerError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
