//! The tenant chain sequencer: the single authority over chain positions.
//!
//! Each tenant gets a lazily created slot (a mutex plus a condition
//! variable).  A writer `reserve`s the next position, builds and appends its
//! entry, and `commit`s the new hash.  While a reservation is outstanding no
//! other writer for that tenant can obtain one, so commits happen strictly
//! in `seq` order and no two entries ever share a predecessor.  Tenants never
//! contend with each other: the slot map lock is only held to look a slot up.
//!
//! Reservations are leases.  A writer that crashes or stalls past
//! `lease_timeout` is presumed dead; the next waiter reclaims the slot,
//! re-reads the chain head from the store, and is handed the same `seq` the
//! abandoned writer held (or the following one, if that writer's append
//! actually landed).  Positions are never skipped.
//!
//! Dropping a `Reservation` without committing releases it immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use tessera_config::SequencerConfig;
use tessera_contracts::{
    entry::{AuditEntry, TenantId},
    error::{LedgerError, LedgerResult},
};

use crate::traits::LedgerStore;

// ── Chain state ───────────────────────────────────────────────────────────────

/// The sequencer's view of one tenant's chain tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantChainState {
    pub tenant_id: TenantId,
    /// Zero before the first entry.
    pub last_seq: u64,
    /// `GENESIS_HASH` before the first entry.
    pub last_hash: String,
    pub last_created_at: Option<DateTime<Utc>>,
}

impl TenantChainState {
    fn genesis(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            last_seq: 0,
            last_hash: AuditEntry::GENESIS_HASH.to_string(),
            last_created_at: None,
        }
    }
}

struct Lease {
    token: u64,
    seq: u64,
    acquired_at: Instant,
}

#[derive(Default)]
struct SlotState {
    /// `None` until seeded from the store, and again after any release that
    /// may have left the store ahead of (or behind) the cached tip.
    chain: Option<TenantChainState>,
    lease: Option<Lease>,
}

struct TenantSlot {
    tenant_id: TenantId,
    state: Mutex<SlotState>,
    released: Condvar,
}

impl TenantSlot {
    fn lock(&self) -> LedgerResult<MutexGuard<'_, SlotState>> {
        self.state.lock().map_err(|_| {
            LedgerError::conflict(self.tenant_id.as_str(), "sequencer slot lock poisoned")
        })
    }

    /// Release the lease identified by `token`, if it is still the current
    /// one, forcing a re-seed from the store on the next reservation.
    fn release(&self, token: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.lease.as_ref().map(|l| l.token) == Some(token) {
            state.lease = None;
            state.chain = None;
            self.released.notify_all();
        }
    }
}

// ── Reservation ───────────────────────────────────────────────────────────────

/// An exclusive, leased claim on the next position of one tenant's chain.
///
/// Must be resolved by `commit` after the entry is durably appended.  If it
/// is dropped instead (error, panic, cancellation) the slot is released and
/// the next writer re-reads the head from the store.
pub struct Reservation {
    slot: Arc<TenantSlot>,
    token: u64,
    seq: u64,
    prev_hash: String,
    not_before: Option<DateTime<Utc>>,
    settled: bool,
}

impl Reservation {
    pub fn tenant_id(&self) -> &TenantId {
        &self.slot.tenant_id
    }

    /// The chain position this reservation grants.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The hash the new entry must link to.
    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    /// `created_at` of the current tip; the new entry may not be earlier.
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// Advance the chain tip to `(seq, hash)` and release the slot.
    ///
    /// Call only after the entry is durable.  If the lease was reclaimed in
    /// the meantime the store's conditional append has already arbitrated
    /// the race, so the cached tip is discarded and re-read by the next
    /// writer instead of being overwritten.
    pub fn commit(mut self, hash: &str, created_at: DateTime<Utc>) -> LedgerResult<()> {
        self.settled = true;
        let mut state = self.slot.lock()?;

        let still_held = state.lease.as_ref().map(|l| l.token) == Some(self.token);
        if still_held {
            state.chain = Some(TenantChainState {
                tenant_id: self.slot.tenant_id.clone(),
                last_seq: self.seq,
                last_hash: hash.to_string(),
                last_created_at: Some(created_at),
            });
            state.lease = None;
            debug!(tenant_id = %self.slot.tenant_id, seq = self.seq, "chain slot committed");
        } else {
            warn!(
                tenant_id = %self.slot.tenant_id,
                seq = self.seq,
                "lease was reclaimed before commit; cached chain tip discarded"
            );
            if state.lease.is_none() {
                state.chain = None;
            }
        }

        self.slot.released.notify_all();
        Ok(())
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            debug!(
                tenant_id = %self.slot.tenant_id,
                seq = self.seq,
                "uncommitted reservation released"
            );
            self.slot.release(self.token);
        }
    }
}

// ── Sequencer ─────────────────────────────────────────────────────────────────

/// Keyed per-tenant lock with leases, seeded from the store's chain heads.
pub struct TenantChainSequencer {
    store: Arc<dyn LedgerStore>,
    config: SequencerConfig,
    slots: Mutex<HashMap<TenantId, Arc<TenantSlot>>>,
    next_token: AtomicU64,
}

impl TenantChainSequencer {
    pub fn new(store: Arc<dyn LedgerStore>, config: SequencerConfig) -> Self {
        Self {
            store,
            config,
            slots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Claim the next position of `tenant_id`'s chain.
    ///
    /// Blocks while another writer holds the tenant's lease.  Returns
    /// `ConcurrencyConflict` if the lease is not released (or expired) within
    /// `acquire_timeout`.
    pub fn reserve(&self, tenant_id: &TenantId) -> LedgerResult<Reservation> {
        let slot = self.slot(tenant_id)?;
        let lease_timeout = self.config.lease_timeout();
        let deadline = Instant::now() + self.config.acquire_timeout();

        let (token, seq, prev_hash, not_before) = {
            let mut state = slot.lock()?;

            loop {
                let held = state.lease.as_ref().map(|l| (l.seq, l.acquired_at));
                let Some((held_seq, acquired_at)) = held else {
                    break;
                };

                if acquired_at.elapsed() >= lease_timeout {
                    warn!(
                        tenant_id = %tenant_id,
                        seq = held_seq,
                        held_ms = acquired_at.elapsed().as_millis() as u64,
                        "reclaiming expired chain lease"
                    );
                    state.lease = None;
                    state.chain = None;
                    break;
                }

                let now = Instant::now();
                if now >= deadline {
                    return Err(LedgerError::conflict(
                        tenant_id.as_str(),
                        format!("timed out waiting for the writer holding seq {}", held_seq),
                    ));
                }
                let wait = deadline
                    .min(acquired_at + lease_timeout)
                    .saturating_duration_since(now);
                state = slot
                    .released
                    .wait_timeout(state, wait)
                    .map_err(|_| {
                        LedgerError::conflict(tenant_id.as_str(), "sequencer slot lock poisoned")
                    })?
                    .0;
            }

            let chain = match state.chain.take() {
                Some(chain) => chain,
                None => self.seed(tenant_id)?,
            };

            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            let seq = chain.last_seq + 1;
            let prev_hash = chain.last_hash.clone();
            let not_before = chain.last_created_at;

            state.chain = Some(chain);
            state.lease = Some(Lease {
                token,
                seq,
                acquired_at: Instant::now(),
            });
            (token, seq, prev_hash, not_before)
        };

        debug!(tenant_id = %tenant_id, seq, "chain slot reserved");

        Ok(Reservation {
            slot,
            token,
            seq,
            prev_hash,
            not_before,
            settled: false,
        })
    }

    /// A copy of the cached tip for `tenant_id`, if one has been seeded.
    pub fn snapshot(&self, tenant_id: &TenantId) -> Option<TenantChainState> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get(tenant_id)?;
        let state = slot.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.chain.clone()
    }

    fn slot(&self, tenant_id: &TenantId) -> LedgerResult<Arc<TenantSlot>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| LedgerError::conflict(tenant_id.as_str(), "slot map lock poisoned"))?;
        let slot = slots.entry(tenant_id.clone()).or_insert_with(|| {
            Arc::new(TenantSlot {
                tenant_id: tenant_id.clone(),
                state: Mutex::new(SlotState::default()),
                released: Condvar::new(),
            })
        });
        Ok(Arc::clone(slot))
    }

    fn seed(&self, tenant_id: &TenantId) -> LedgerResult<TenantChainState> {
        let state = match self.store.head(tenant_id)? {
            Some(head) => TenantChainState {
                tenant_id: tenant_id.clone(),
                last_seq: head.seq,
                last_hash: head.hash,
                last_created_at: Some(head.created_at),
            },
            None => TenantChainState::genesis(tenant_id.clone()),
        };
        debug!(tenant_id = %tenant_id, last_seq = state.last_seq, "chain slot seeded from store");
        Ok(state)
    }
}
