//! Chain verification report types.
//!
//! A verification run either walks the whole requested window cleanly or
//! stops at the first `ChainBreak`, which pinpoints the offending `seq` and
//! what was expected there.

use serde::{Deserialize, Serialize};

use crate::entry::TenantId;

/// What went wrong at a broken link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakKind {
    /// The stored `hash` differs from the digest recomputed from the stored fields.
    HashMismatch { expected: String, actual: String },

    /// The stored `prev_hash` does not equal the previous entry's `hash`
    /// (or the genesis sentinel).
    PrevHashMismatch { expected: String, actual: String },

    /// A `seq` was skipped or repeated.
    SequenceGap { expected_seq: u64, actual_seq: u64 },

    /// The store returned an entry owned by another tenant.
    ForeignTenant { found: TenantId },
}

/// The first point of failure found in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: BreakKind,
}

impl ChainBreak {
    pub fn describe(&self) -> String {
        match &self.kind {
            BreakKind::HashMismatch { expected, actual } => format!(
                "hash mismatch at seq {}: recomputed {} but stored {}",
                self.seq, expected, actual
            ),
            BreakKind::PrevHashMismatch { expected, actual } => format!(
                "prev_hash mismatch at seq {}: expected {} but stored {}",
                self.seq, expected, actual
            ),
            BreakKind::SequenceGap {
                expected_seq,
                actual_seq,
            } => format!("sequence gap: expected seq {} but found {}", expected_seq, actual_seq),
            BreakKind::ForeignTenant { found } => {
                format!("entry at seq {} belongs to tenant '{}'", self.seq, found)
            }
        }
    }
}

/// Outcome of verifying one tenant's chain over a snapshot window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub tenant_id: TenantId,

    /// First `seq` examined.
    pub from_seq: u64,

    /// Last `seq` in the snapshot window (the chain head when the run began).
    /// Zero for an empty chain.
    pub through_seq: u64,

    /// Number of entries that passed before the run stopped.
    pub entries_checked: u64,

    /// `hash` of the last intact entry, if any.
    pub terminal_hash: Option<String>,

    /// True when the predecessor of `from_seq` was unavailable and the first
    /// entry's own `prev_hash` was trusted as the starting anchor.
    pub anchored: bool,

    pub chain_break: Option<ChainBreak>,
}

impl VerificationReport {
    pub fn is_intact(&self) -> bool {
        self.chain_break.is_none()
    }
}
