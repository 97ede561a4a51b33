//! Batched mutation engine
//!
//! Splits the flat operation queue into chunks under the per-call request
//! ceiling, preserves order across chunks, and retries quota-exceeded chunks
//! with bounded exponential backoff. A chunk that exhausts its retry budget
//! surfaces as a resumable error carrying the first unapplied chunk index;
//! any other remote failure aborts immediately.

pub mod requests;

pub use requests::{MutationRequest, to_request};

use async_trait::async_trait;
use fairesheets_core::config::EngineConfig;
use fairesheets_core::error::{FaireError, Result};
use fairesheets_core::ops::Operation;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure reported by a remote backend for one batch call
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The write quota was exceeded; the chunk may be retried after a delay
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    /// Any other remote failure (permission, not-found, malformed request)
    #[error("request failed: {0}")]
    Other(String),
}

/// Transport seam to the remote tabular-document service.
///
/// A call either applies the whole chunk or none of it; partial application
/// is the backend's problem to prevent, not the engine's to repair.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Apply one chunk of requests as a single remote batch call
    async fn apply_chunk(&self, requests: &[MutationRequest]) -> std::result::Result<(), RemoteError>;
}

/// Applies operation queues against a backend under the engine configuration
#[derive(Debug, Clone)]
pub struct BatchEngine {
    config: EngineConfig,
}

impl BatchEngine {
    /// Create an engine with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FaireError::Config`] if the chunk ceiling or backoff policy
    /// is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Number of chunks the given queue length splits into
    #[must_use]
    pub fn chunk_count(&self, op_count: usize) -> usize {
        op_count.div_ceil(self.config.max_ops_per_chunk)
    }

    /// Apply the whole queue from the beginning.
    ///
    /// # Errors
    ///
    /// See [`BatchEngine::apply_from`].
    pub async fn apply(&self, ops: &[Operation], backend: &dyn SheetsBackend) -> Result<usize> {
        self.apply_from(ops, 0, backend).await
    }

    /// Apply the queue starting at `start_chunk`, resuming a previous run
    /// that stopped with [`FaireError::QuotaExhausted`].
    ///
    /// Returns the number of chunks applied in this call.
    ///
    /// # Errors
    ///
    /// Returns [`FaireError::QuotaExhausted`] when a chunk runs out of retry
    /// attempts; its `chunk_index` is the first unapplied chunk, valid as the
    /// next `start_chunk`. Returns [`FaireError::Remote`] on any non-quota
    /// backend failure, without retrying.
    pub async fn apply_from(
        &self,
        ops: &[Operation],
        start_chunk: usize,
        backend: &dyn SheetsBackend,
    ) -> Result<usize> {
        let total = self.chunk_count(ops.len());
        let mut applied = 0;

        for (chunk_index, chunk) in ops
            .chunks(self.config.max_ops_per_chunk)
            .enumerate()
            .skip(start_chunk)
        {
            let requests: Vec<MutationRequest> = chunk.iter().map(to_request).collect();
            self.apply_one(chunk_index, &requests, backend).await?;
            applied += 1;
            debug!(chunk = chunk_index + 1, total, requests = requests.len(), "chunk applied");
        }

        info!(chunks = applied, operations = ops.len(), "operation queue applied");
        Ok(applied)
    }

    /// Apply one chunk, retrying quota signals under the backoff policy
    async fn apply_one(
        &self,
        chunk_index: usize,
        requests: &[MutationRequest],
        backend: &dyn SheetsBackend,
    ) -> Result<()> {
        let policy = &self.config.backoff;
        let mut attempts = 0;
        loop {
            match backend.apply_chunk(requests).await {
                Ok(()) => return Ok(()),
                Err(RemoteError::QuotaExceeded(message)) => {
                    attempts += 1;
                    if attempts >= policy.max_attempts {
                        return Err(FaireError::quota_exhausted(chunk_index, attempts));
                    }
                    let delay = policy.delay_for_attempt(attempts - 1);
                    warn!(
                        chunk = chunk_index,
                        attempt = attempts,
                        delay_secs = delay.as_secs_f64(),
                        %message,
                        "quota exceeded; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(RemoteError::Other(message)) => {
                    return Err(FaireError::remote(message));
                }
            }
        }
    }
}
