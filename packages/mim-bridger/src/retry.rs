//! Retry policy and error classification for bridge attempts
//!
//! Every failed attempt is retried until the wallet's attempt budget is spent;
//! the error class only decides how loudly a failure is logged.

use rand::Rng;
use std::time::Duration;

use crate::config::SecondsRange;

/// Per-wallet retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per wallet, including the first
    pub max_attempts: u32,
    /// Backoff drawn uniformly between attempts
    pub backoff: SecondsRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: SecondsRange::new(5, 10),
        }
    }
}

impl RetryPolicy {
    /// Check if another attempt follows `attempt` (1-indexed)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Draw the pause before the next attempt
    pub fn sample_backoff<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.backoff.sample(rng)
    }
}

/// Classifies attempt errors for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// RPC timeout, connection drop, rate limiting
    Transient,
    /// Gas price below the node's floor
    Underpriced,
    /// Nonce already used
    NonceTooLow,
    /// Nonce ahead of the account's pending count
    NonceTooHigh,
    /// Revert, insufficient funds, bad signature
    Permanent,
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Underpriced => "underpriced",
            ErrorClass::NonceTooLow => "nonce_too_low",
            ErrorClass::NonceTooHigh => "nonce_too_high",
            ErrorClass::Permanent => "permanent",
            ErrorClass::Unknown => "unknown",
        }
    }
}

/// Classify an error message
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("temporarily unavailable")
        || error_lower.contains("not received within")
    {
        return ErrorClass::Transient;
    }

    if error_lower.contains("underpriced")
        || error_lower.contains("replacement transaction")
        || error_lower.contains("gas price too low")
    {
        return ErrorClass::Underpriced;
    }

    if error_lower.contains("nonce too low") || error_lower.contains("already known") {
        return ErrorClass::NonceTooLow;
    }

    if error_lower.contains("nonce too high") {
        return ErrorClass::NonceTooHigh;
    }

    if error_lower.contains("reverted")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("invalid signature")
        || error_lower.contains("out of gas")
    {
        return ErrorClass::Permanent;
    }

    ErrorClass::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        };
        assert!(!policy.should_retry(1));
    }

    #[test]
    fn test_backoff_within_bounds() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let backoff = policy.sample_backoff(&mut rng);
            assert!(backoff >= Duration::from_secs(5));
            assert!(backoff <= Duration::from_secs(10));
        }
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(classify_error("connection timeout"), ErrorClass::Transient);
        assert_eq!(
            classify_error("receipt for 0xab not received within 300s"),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error("replacement transaction underpriced"),
            ErrorClass::Underpriced
        );
        assert_eq!(classify_error("nonce too low"), ErrorClass::NonceTooLow);
        assert_eq!(classify_error("Nonce too high"), ErrorClass::NonceTooHigh);
        assert_eq!(
            classify_error("estimateSendFee failed: execution reverted"),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error("insufficient funds for gas * price + value"),
            ErrorClass::Permanent
        );
        assert_eq!(classify_error("some unknown error"), ErrorClass::Unknown);
    }
}
