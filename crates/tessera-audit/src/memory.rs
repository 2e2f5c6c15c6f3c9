//! In-memory implementation of `LedgerStore`.
//!
//! `InMemoryLedgerStore` keeps one `Vec` per tenant behind a `Mutex`.  It is
//! the reference store for tests and single-process embedding; contents are
//! lost when the process exits.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use tessera_contracts::{
    entry::{AuditEntry, TenantId},
    error::{LedgerError, LedgerResult},
    query::{AuditQuery, Page},
    storage::{ChainHead, StorageOp},
};
use tessera_core::traits::LedgerStore;

use crate::guard::AppendOnlyGuard;

// ── Internal state ────────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryState {
    /// Each tenant's chain in append order.
    pub(crate) chains: HashMap<TenantId, Vec<AuditEntry>>,
}

/// Entries of one chain with `from_seq <= seq <= through_seq`, by `seq`.
pub(crate) fn range_of(
    chain: Option<&Vec<AuditEntry>>,
    from_seq: u64,
    through_seq: u64,
) -> Vec<AuditEntry> {
    let mut entries: Vec<AuditEntry> = chain
        .map(|c| {
            c.iter()
                .filter(|e| e.seq >= from_seq && e.seq <= through_seq)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    entries.sort_by_key(|e| e.seq);
    entries
}

/// Filter one tenant's chain and cut a page ordered by `(created_at, seq)`.
pub(crate) fn page_of(
    chain: Option<&Vec<AuditEntry>>,
    query: &AuditQuery,
    offset: usize,
    limit: usize,
) -> Page<AuditEntry> {
    let mut matched: Vec<AuditEntry> = chain
        .map(|c| c.iter().filter(|e| query.matches(e)).cloned().collect())
        .unwrap_or_default();
    matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
    Page::from_sorted(matched, offset, limit)
}

// ── Public store ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryLedgerStore {
    pub(crate) state: Mutex<InMemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a raw storage operation.
    ///
    /// This is the lowest layer of the store; `append` goes through it too.
    /// Updates and deletes are rejected by the guard before any state is
    /// touched.
    pub fn execute(&self, op: StorageOp) -> LedgerResult<()> {
        let entry = AppendOnlyGuard::admit(op)?;
        let mut state = self.lock()?;

        let head = state
            .chains
            .get(&entry.tenant_id)
            .and_then(|c| c.last())
            .map(ChainHead::of);
        AppendOnlyGuard::check_link(head.as_ref(), &entry)?;

        debug!(tenant_id = %entry.tenant_id, seq = entry.seq, "entry stored in memory");
        state
            .chains
            .entry(entry.tenant_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    /// Total entries across all tenants.
    pub fn len(&self) -> usize {
        self.lock()
            .map(|s| s.chains.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, InMemoryState>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::storage(format!("ledger state lock poisoned: {}", e)))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
        self.execute(StorageOp::Insert(Box::new(entry.clone())))
    }

    fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<ChainHead>> {
        let state = self.lock()?;
        Ok(state
            .chains
            .get(tenant_id)
            .and_then(|c| c.last())
            .map(ChainHead::of))
    }

    fn get(&self, tenant_id: &TenantId, seq: u64) -> LedgerResult<Option<AuditEntry>> {
        let state = self.lock()?;
        Ok(state
            .chains
            .get(tenant_id)
            .and_then(|c| c.iter().find(|e| e.seq == seq))
            .cloned())
    }

    fn read_range(
        &self,
        tenant_id: &TenantId,
        from_seq: u64,
        through_seq: u64,
    ) -> LedgerResult<Vec<AuditEntry>> {
        let state = self.lock()?;
        Ok(range_of(state.chains.get(tenant_id), from_seq, through_seq))
    }

    fn query(&self, query: &AuditQuery, offset: usize, limit: usize) -> LedgerResult<Page<AuditEntry>> {
        let state = self.lock()?;
        Ok(page_of(state.chains.get(&query.tenant_id), query, offset, limit))
    }

    fn tenants(&self) -> LedgerResult<Vec<TenantId>> {
        let state = self.lock()?;
        let mut tenants: Vec<TenantId> = state.chains.keys().cloned().collect();
        tenants.sort();
        Ok(tenants)
    }
}
