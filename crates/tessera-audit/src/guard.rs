//! Append-only enforcement at the storage boundary.
//!
//! Every raw operation a store receives passes through `AppendOnlyGuard`
//! before the backend sees it.  Inserts are admitted; updates and deletes
//! are rejected with `AppendOnlyViolation` no matter who asks.  There is no
//! override flag.

use tracing::error;

use tessera_contracts::{
    entry::AuditEntry,
    error::{LedgerError, LedgerResult},
    storage::{ChainHead, StorageOp},
};

pub struct AppendOnlyGuard;

impl AppendOnlyGuard {
    /// Return the entry to insert, or reject the operation.
    pub fn admit(op: StorageOp) -> LedgerResult<AuditEntry> {
        match op {
            StorageOp::Insert(entry) => {
                if entry.hash.is_empty() {
                    return Err(LedgerError::validation(format!(
                        "refusing to store unsealed entry seq {} for tenant '{}'",
                        entry.seq, entry.tenant_id
                    )));
                }
                Ok(*entry)
            }
            rejected => {
                error!(
                    tenant_id = %rejected.tenant_id(),
                    seq = rejected.seq(),
                    operation = rejected.name(),
                    "append-only violation: mutation of audit ledger rejected"
                );
                Err(LedgerError::AppendOnlyViolation {
                    tenant_id: rejected.tenant_id().to_string(),
                    seq: rejected.seq(),
                    operation: rejected.name().to_string(),
                })
            }
        }
    }

    /// Conditional-insert check: `entry` must extend `head` by exactly one.
    pub fn check_link(head: Option<&ChainHead>, entry: &AuditEntry) -> LedgerResult<()> {
        let (expected_seq, expected_prev) = match head {
            Some(h) => (h.seq + 1, h.hash.as_str()),
            None => (1, AuditEntry::GENESIS_HASH),
        };
        if entry.seq != expected_seq || entry.prev_hash != expected_prev {
            return Err(LedgerError::conflict(
                entry.tenant_id.as_str(),
                format!(
                    "append of seq {} does not extend head (expected seq {})",
                    entry.seq, expected_seq
                ),
            ));
        }
        Ok(())
    }
}
