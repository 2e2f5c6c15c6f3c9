//! Trait seams of the Tessera ledger.
//!
//! - `LedgerStore`   — durable, append-only entry storage
//! - `EntrySealer`   — canonical serialization + digest of an entry
//! - `ChainVerifier` — read-only integrity audit of a tenant chain
//!
//! `AuditLedger` wires them together.  Implementations live in
//! `tessera-audit` and `tessera-verify`.

use tessera_contracts::{
    entry::{AuditEntry, TenantId},
    error::LedgerResult,
    query::{AuditQuery, Page},
    storage::ChainHead,
    verify::VerificationReport,
};

/// Durable storage for audit entries.
///
/// The interface has no update or delete: the only write is `append`.
/// Implementations must make `append` a conditional insert that rejects,
/// with `LedgerError::ConcurrencyConflict`, any entry whose `seq` is not
/// the tenant head's `seq + 1` or whose `prev_hash` is not the head's
/// `hash`.  That check is what keeps writers in different processes from
/// forking a chain.
pub trait LedgerStore: Send + Sync {
    /// Durably append one sealed entry.
    fn append(&self, entry: &AuditEntry) -> LedgerResult<()>;

    /// The last appended link of `tenant_id`'s chain, if any.
    fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<ChainHead>>;

    /// A single entry by chain position.
    fn get(&self, tenant_id: &TenantId, seq: u64) -> LedgerResult<Option<AuditEntry>>;

    /// Entries with `from_seq <= seq <= through_seq`, ascending by `seq`.
    fn read_range(
        &self,
        tenant_id: &TenantId,
        from_seq: u64,
        through_seq: u64,
    ) -> LedgerResult<Vec<AuditEntry>>;

    /// Filtered, paginated entries of one tenant ordered by
    /// `(created_at, seq)` ascending.
    fn query(&self, query: &AuditQuery, offset: usize, limit: usize)
        -> LedgerResult<Page<AuditEntry>>;

    /// Every tenant with at least one entry.
    fn tenants(&self) -> LedgerResult<Vec<TenantId>>;
}

/// Computes the chain hash of an entry.
///
/// The result must depend on every field except `hash` itself, and must be
/// reproducible byte-for-byte from the stored entry at any later time.
pub trait EntrySealer: Send + Sync {
    /// Short algorithm name, e.g. `"sha256"`.
    fn algorithm(&self) -> &'static str;

    /// Digest of `canonical(entry minus hash) || entry.prev_hash`.
    fn compute_hash(&self, entry: &AuditEntry) -> LedgerResult<String>;
}

/// Walks a tenant's chain and reports the first broken link.
///
/// Implementations are read-only.  They must never "repair" a chain.
pub trait ChainVerifier: Send + Sync {
    fn verify(&self, tenant_id: &TenantId, from_seq: u64) -> LedgerResult<VerificationReport>;
}
