//! Error types for the Tessera audit ledger.
//!
//! Every fallible ledger operation returns `LedgerResult<T>`. Variants carry
//! the tenant and chain position where applicable so that security-relevant
//! failures reach operators with full context.

use thiserror::Error;

/// The unified error type for the Tessera ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The action descriptor is malformed (bad action name, verb/snapshot
    /// mismatch, missing entity).  Rejected before any chain slot is taken.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// Transient contention on a tenant chain, a reclaimed lease, or a
    /// conditional append that lost the race.  Safe to retry with backoff.
    #[error("concurrency conflict on tenant '{tenant_id}': {reason}")]
    ConcurrencyConflict { tenant_id: String, reason: String },

    /// An update or delete was attempted against the ledger.
    ///
    /// Never retried.  There is no privileged path around this error.
    #[error("append-only violation: {operation} of entry seq {seq} in tenant '{tenant_id}' rejected")]
    AppendOnlyViolation {
        tenant_id: String,
        seq: u64,
        operation: String,
    },

    /// Recomputed hash or `prev_hash` continuity failed.  Signals tampering
    /// or corruption; the stored data is left untouched.
    #[error("chain integrity error in tenant '{tenant_id}' at seq {seq}: {reason}")]
    ChainIntegrity {
        tenant_id: String,
        seq: u64,
        reason: String,
    },

    /// The backing store failed to read or persist data.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// An entry could not be rendered to or parsed from its serialized form.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl LedgerError {
    /// True only for errors the write path may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict { .. })
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        LedgerError::Validation {
            reason: reason.into(),
        }
    }

    pub fn conflict(tenant_id: impl Into<String>, reason: impl Into<String>) -> Self {
        LedgerError::ConcurrencyConflict {
            tenant_id: tenant_id.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        LedgerError::Storage {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization {
            reason: e.to_string(),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage {
            reason: e.to_string(),
        }
    }
}

/// Convenience alias used throughout the Tessera crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
