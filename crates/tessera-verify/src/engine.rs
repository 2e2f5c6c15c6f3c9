//! Snapshot chain verifier for the Tessera ledger.
//!
//! `SnapshotVerifier` implements the `ChainVerifier` trait from
//! `tessera-core`.  A run has three phases:
//!
//! 1. **Snapshot** — the tenant's head is read once.  Its `seq` bounds the
//!    window, so entries appended while the run is in progress are outside
//!    it and can never cause a false failure.
//! 2. **Anchor** — the expected `prev_hash` of `from_seq` is the genesis
//!    sentinel, or the stored `hash` of `from_seq - 1`.  When that
//!    predecessor is gone (a truncated prefix) the first entry's own
//!    `prev_hash` is trusted and the report is marked `anchored`.
//! 3. **Walk** — every entry in the window is checked by `walk_chain` and
//!    the run stops at the first broken link.
//!
//! The verifier only reads.  A break is reported, never repaired.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use tessera_audit::walk_chain;
use tessera_contracts::{
    entry::{AuditEntry, TenantId},
    error::{LedgerError, LedgerResult},
    verify::VerificationReport,
};
use tessera_core::traits::{ChainVerifier, EntrySealer, LedgerStore};

pub struct SnapshotVerifier {
    store: Arc<dyn LedgerStore>,
    sealer: Arc<dyn EntrySealer>,
}

impl SnapshotVerifier {
    pub fn new(store: Arc<dyn LedgerStore>, sealer: Arc<dyn EntrySealer>) -> Self {
        Self { store, sealer }
    }

    /// Expected `prev_hash` of `from_seq`, and whether it had to be taken
    /// from the first entry itself.
    fn anchor(
        &self,
        tenant_id: &TenantId,
        from_seq: u64,
        first: Option<&AuditEntry>,
    ) -> LedgerResult<(String, bool)> {
        if from_seq == 1 {
            return Ok((AuditEntry::GENESIS_HASH.to_string(), false));
        }
        if let Some(prev) = self.store.get(tenant_id, from_seq - 1)? {
            return Ok((prev.hash, false));
        }
        match first {
            Some(entry) => {
                warn!(
                    tenant_id = %tenant_id,
                    from_seq,
                    "predecessor entry missing; anchoring on stored prev_hash of truncated chain"
                );
                Ok((entry.prev_hash.clone(), true))
            }
            None => Ok((AuditEntry::GENESIS_HASH.to_string(), false)),
        }
    }
}

impl ChainVerifier for SnapshotVerifier {
    fn verify(&self, tenant_id: &TenantId, from_seq: u64) -> LedgerResult<VerificationReport> {
        if from_seq == 0 {
            return Err(LedgerError::validation("from_seq starts at 1"));
        }

        let through_seq = self.store.head(tenant_id)?.map_or(0, |h| h.seq);
        let entries = if from_seq <= through_seq {
            self.store.read_range(tenant_id, from_seq, through_seq)?
        } else {
            Vec::new()
        };
        debug!(
            tenant_id = %tenant_id,
            from_seq,
            through_seq,
            entries = entries.len(),
            "verification snapshot taken"
        );

        let (start_prev, anchored) = if from_seq <= through_seq {
            self.anchor(tenant_id, from_seq, entries.first())?
        } else {
            (AuditEntry::GENESIS_HASH.to_string(), false)
        };
        let walk = walk_chain(self.sealer.as_ref(), tenant_id, from_seq, &start_prev, &entries)?;

        let report = VerificationReport {
            tenant_id: tenant_id.clone(),
            from_seq,
            through_seq,
            entries_checked: walk.checked,
            terminal_hash: walk.terminal_hash,
            anchored,
            chain_break: walk.chain_break,
        };

        match &report.chain_break {
            Some(b) => error!(
                tenant_id = %tenant_id,
                seq = b.seq,
                entries_checked = report.entries_checked,
                detail = %b.describe(),
                "chain break detected"
            ),
            None => info!(
                tenant_id = %tenant_id,
                from_seq,
                through_seq,
                entries_checked = report.entries_checked,
                algorithm = self.sealer.algorithm(),
                "chain verified"
            ),
        }
        Ok(report)
    }
}
