//! Engine and backoff configuration
//!
//! The remote service enforces a write quota of roughly sixty requests per
//! minute per account. Every caller shares this single policy; a caller
//! needing a different cadence supplies different parameters, never a
//! different code path.

use crate::error::{FaireError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff for quota-exceeded retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Maximum attempts per chunk before giving up
    pub max_attempts: u32,
    /// Delay after the first quota signal
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Ceiling on any single delay; covers the quota window
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Multiplier applied per attempt
    pub growth_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(90),
            growth_factor: 1.5,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retrying after the given zero-based attempt:
    /// `min(max_delay, base_delay * growth_factor^attempt)`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.growth_factor.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let scaled = self.base_delay.mul_f64(factor);
        scaled.min(self.max_delay)
    }

    /// Reject non-positive growth or a zero attempt budget
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(FaireError::config("max_attempts must be at least 1"));
        }
        if self.growth_factor < 1.0 {
            return Err(FaireError::config("growth_factor must be at least 1.0"));
        }
        if self.max_delay < self.base_delay {
            return Err(FaireError::config("max_delay must not be below base_delay"));
        }
        Ok(())
    }
}

/// Configuration for the batched mutation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Request-count ceiling per remote batch call
    pub max_ops_per_chunk: usize,
    /// Retry policy for quota-exceeded signals
    pub backoff: BackoffPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_ops_per_chunk: 200,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the chunk ceiling and the backoff policy
    pub fn validate(&self) -> Result<()> {
        if self.max_ops_per_chunk == 0 {
            return Err(FaireError::config("max_ops_per_chunk must be at least 1"));
        }
        self.backoff.validate()
    }
}
