//! Private key loading
//!
//! The key file holds one hex private key per line (with or without `0x`).
//! Blank lines and `#` comments are skipped. Keys never appear in logs or
//! errors; a bad line is reported by its number only.

use std::fmt;
use std::path::Path;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use eyre::{Result, WrapErr};

use crate::error::BridgerError;
use crate::redact::Redacted;

/// A wallet's signing key and the address derived from it
#[derive(Clone)]
pub struct SigningKey {
    address: Address,
    signer: Redacted<PrivateKeySigner>,
}

impl SigningKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let signer: PrivateKeySigner = raw.trim().parse().ok()?;
        Some(Self {
            address: signer.address(),
            signer: Redacted(signer),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signer for transaction signing. Never log it.
    pub fn signer(&self) -> &PrivateKeySigner {
        self.signer.expose()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("address", &self.address)
            .field("signer", &self.signer)
            .finish()
    }
}

/// Parse key file contents
pub fn parse_keys(contents: &str) -> std::result::Result<Vec<SigningKey>, BridgerError> {
    let mut keys = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let key = SigningKey::parse(line).ok_or(BridgerError::InvalidKey { line: idx + 1 })?;
        keys.push(key);
    }

    if keys.is_empty() {
        return Err(BridgerError::NoKeys);
    }
    Ok(keys)
}

/// Read and parse the key file at `path`
pub fn load_keys(path: &Path) -> Result<Vec<SigningKey>> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read key file {}", path.display()))?;
    let keys = parse_keys(&contents)
        .wrap_err_with(|| format!("Failed to parse key file {}", path.display()))?;
    tracing::info!(count = keys.len(), path = %path.display(), "Loaded wallet keys");
    Ok(keys)
}
