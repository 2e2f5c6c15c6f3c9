//! Configuration schema.
//!
//! A `LedgerConfig` is deserialized from TOML.  Every table and every field
//! has a default, so an empty document is a valid configuration.
//!
//! Example:
//! ```toml
//! [sequencer]
//! lease_timeout_ms = 5000
//! acquire_timeout_ms = 2000
//!
//! [retry]
//! max_attempts = 5
//!
//! [hashing]
//! algorithm = "sha512"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Chain-slot leasing for the per-tenant sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// A reservation held longer than this is considered abandoned and may
    /// be reclaimed by the next writer for the tenant.
    pub lease_timeout_ms: u64,

    /// How long a writer waits for a busy tenant before giving up with a
    /// concurrency conflict.
    pub acquire_timeout_ms: u64,
}

impl SequencerConfig {
    pub fn lease_timeout(&self) -> Duration {
        Duration::from_millis(self.lease_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            lease_timeout_ms: 5_000,
            acquire_timeout_ms: 2_000,
        }
    }
}

/// Retry policy for concurrency conflicts on the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    /// Exponential backoff before attempt `attempt + 1` (attempt is 1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 5,
            max_backoff_ms: 200,
        }
    }
}

/// Page size limits for the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl QueryConfig {
    /// Resolve a requested limit: `None` takes the default, anything above
    /// `max_limit` is clamped.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

/// Digest used to seal entries.
///
/// Expressed in TOML as a lowercase string: `"sha256"` or `"sha512"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub algorithm: HashAlgorithm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON Lines file backing the durable store.  Unset means in-memory.
    pub path: Option<PathBuf>,
}

/// The top-level structure deserialized from a TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub sequencer: SequencerConfig,
    pub retry: RetryConfig,
    pub query: QueryConfig,
    pub hashing: HashingConfig,
    pub storage: StorageConfig,
}
