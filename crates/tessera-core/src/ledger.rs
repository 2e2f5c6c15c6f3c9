//! The audit ledger: the write path and the operator-facing read path.
//!
//! Every write follows the same pipeline:
//!
//!   Validate → Reserve(seq, prev_hash) → Build + Seal → Append → Commit
//!
//! A call returns `Ok` only after the entry is durable and chain-linked.
//! Validation failures never touch the sequencer.  Concurrency conflicts
//! (a busy tenant, a reclaimed lease, a conditional append that lost to
//! another process) are retried with exponential backoff; once retries are
//! exhausted the conflict is returned, never swallowed.  Append-only and
//! integrity errors propagate unmodified.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use tessera_config::{LedgerConfig, RetryConfig};
use tessera_contracts::{
    action::ActionDescriptor,
    entry::{Actor, AuditEntry, TenantId},
    error::{LedgerError, LedgerResult},
    query::{AuditQuery, Page, Pagination},
    verify::VerificationReport,
};

use crate::{
    builder::EntryBuilder,
    query::QuerySurface,
    sequencer::TenantChainSequencer,
    traits::{ChainVerifier, EntrySealer, LedgerStore},
};

/// The tamper-evident audit ledger.
///
/// Owns the trusted components (store, sealer, verifier) and enforces the
/// write pipeline on every `log_*` call.  Cheap to share behind an `Arc`;
/// all methods take `&self`.
pub struct AuditLedger {
    store: Arc<dyn LedgerStore>,
    sequencer: TenantChainSequencer,
    builder: EntryBuilder,
    queries: QuerySurface,
    verifier: Box<dyn ChainVerifier>,
    retry: RetryConfig,
}

impl AuditLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        sealer: Arc<dyn EntrySealer>,
        verifier: Box<dyn ChainVerifier>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            sequencer: TenantChainSequencer::new(Arc::clone(&store), config.sequencer.clone()),
            builder: EntryBuilder::new(sealer),
            queries: QuerySurface::new(Arc::clone(&store), config.query.clone()),
            verifier,
            retry: config.retry.clone(),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn sequencer(&self) -> &TenantChainSequencer {
        &self.sequencer
    }

    // ── Inbound interface ─────────────────────────────────────────────────────

    pub fn log_create(
        &self,
        tenant_id: &TenantId,
        actor: &Actor,
        entity: &str,
        entity_id: &str,
        after: Value,
    ) -> LedgerResult<AuditEntry> {
        self.record(ActionDescriptor::create(
            tenant_id.clone(),
            actor.clone(),
            entity,
            entity_id,
            after,
        ))
    }

    pub fn log_update(
        &self,
        tenant_id: &TenantId,
        actor: &Actor,
        entity: &str,
        entity_id: &str,
        before: Value,
        after: Value,
    ) -> LedgerResult<AuditEntry> {
        self.record(ActionDescriptor::update(
            tenant_id.clone(),
            actor.clone(),
            entity,
            entity_id,
            before,
            after,
        ))
    }

    pub fn log_delete(
        &self,
        tenant_id: &TenantId,
        actor: &Actor,
        entity: &str,
        entity_id: &str,
        before: Value,
    ) -> LedgerResult<AuditEntry> {
        self.record(ActionDescriptor::delete(
            tenant_id.clone(),
            actor.clone(),
            entity,
            entity_id,
            before,
        ))
    }

    /// Record a non-CRUD event such as `User.login` or `*.export`.
    pub fn log_action(
        &self,
        tenant_id: &TenantId,
        actor: &Actor,
        action: &str,
        entity: Option<(&str, &str)>,
        metadata: Option<Value>,
    ) -> LedgerResult<AuditEntry> {
        let mut descriptor = ActionDescriptor::new(tenant_id.clone(), actor.clone(), action);
        if let Some((entity, entity_id)) = entity {
            descriptor = descriptor.with_entity(entity, entity_id);
        }
        descriptor.metadata = metadata;
        self.record(descriptor)
    }

    /// Validate, sequence, seal, and durably append one descriptor.
    pub fn record(&self, descriptor: ActionDescriptor) -> LedgerResult<AuditEntry> {
        EntryBuilder::validate(&descriptor)?;

        let mut attempt = 1;
        loop {
            match self.append_once(&descriptor) {
                Ok(entry) => {
                    info!(
                        tenant_id = %entry.tenant_id,
                        seq = entry.seq,
                        action = %entry.action,
                        entry_id = %entry.id,
                        "audit entry appended"
                    );
                    return Ok(entry);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        tenant_id = %descriptor.tenant_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "audit append conflicted; retrying"
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => {
                    match &e {
                        LedgerError::AppendOnlyViolation { .. } | LedgerError::ChainIntegrity { .. } => {
                            error!(
                                tenant_id = %descriptor.tenant_id,
                                action = %descriptor.action,
                                error = %e,
                                "security-relevant ledger failure"
                            );
                        }
                        _ => {
                            warn!(
                                tenant_id = %descriptor.tenant_id,
                                action = %descriptor.action,
                                attempts = attempt,
                                error = %e,
                                "audit append failed"
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }
    }

    fn append_once(&self, descriptor: &ActionDescriptor) -> LedgerResult<AuditEntry> {
        let reservation = self.sequencer.reserve(&descriptor.tenant_id)?;
        let entry = self.builder.build(descriptor, &reservation)?;

        // On failure the reservation is dropped, which releases the slot and
        // forces the next writer to re-read the head from the store.
        self.store.append(&entry)?;

        reservation.commit(&entry.hash, entry.created_at)?;
        debug!(tenant_id = %entry.tenant_id, seq = entry.seq, "audit entry committed");
        Ok(entry)
    }

    // ── Outbound interface ────────────────────────────────────────────────────

    pub fn list(&self, query: &AuditQuery, pagination: Pagination) -> LedgerResult<Page<AuditEntry>> {
        self.queries.list(query, pagination)
    }

    /// Verify `tenant_id`'s chain from `from_seq` through the current head.
    pub fn verify(&self, tenant_id: &TenantId, from_seq: u64) -> LedgerResult<VerificationReport> {
        let report = self.verifier.verify(tenant_id, from_seq)?;
        if let Some(b) = &report.chain_break {
            error!(
                tenant_id = %tenant_id,
                seq = b.seq,
                detail = %b.describe(),
                "audit chain verification failed"
            );
        }
        Ok(report)
    }

    /// Like `verify`, but a broken chain is returned as
    /// `LedgerError::ChainIntegrity`.
    pub fn verify_strict(&self, tenant_id: &TenantId, from_seq: u64) -> LedgerResult<VerificationReport> {
        let report = self.verify(tenant_id, from_seq)?;
        match &report.chain_break {
            Some(b) => Err(LedgerError::ChainIntegrity {
                tenant_id: tenant_id.to_string(),
                seq: b.seq,
                reason: b.describe(),
            }),
            None => Ok(report),
        }
    }
}
