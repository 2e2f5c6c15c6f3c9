//! Hash-chain primitives: sealing entries and walking a chain.
//!
//! Hash input layout (bytes, in order):
//!   1. canonical JSON of the entry minus `hash` (see `canonical`)
//!   2. `prev_hash` as UTF-8 bytes
//!
//! `prev_hash` also appears inside the canonical object; feeding it a
//! second time as a trailing part keeps the layout explicit for anyone
//! re-implementing the verifier.

use tessera_config::HashAlgorithm;
use tessera_contracts::{
    entry::{AuditEntry, TenantId},
    error::LedgerResult,
    verify::{BreakKind, ChainBreak},
};
use tessera_core::traits::EntrySealer;

use crate::{
    canonical::canonical_bytes,
    digest::{hash_function, HashFunction},
};

/// Seals entries as `digest(canonical(entry minus hash) || prev_hash)`.
pub struct ChainHasher {
    hash_fn: Box<dyn HashFunction>,
}

impl ChainHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            hash_fn: hash_function(algorithm),
        }
    }

    pub fn sha256() -> Self {
        Self::new(HashAlgorithm::Sha256)
    }
}

impl EntrySealer for ChainHasher {
    fn algorithm(&self) -> &'static str {
        self.hash_fn.name()
    }

    fn compute_hash(&self, entry: &AuditEntry) -> LedgerResult<String> {
        let canonical = canonical_bytes(entry)?;
        Ok(self
            .hash_fn
            .digest_hex(&[canonical.as_slice(), entry.prev_hash.as_bytes()]))
    }
}

/// Result of walking a contiguous run of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainWalk {
    /// Entries that passed every check before the walk stopped.
    pub checked: u64,
    /// `hash` of the last entry that passed.
    pub terminal_hash: Option<String>,
    pub chain_break: Option<ChainBreak>,
}

/// Walk `entries` (ascending by `seq`) and stop at the first broken link.
///
/// The first entry must carry `start_seq` and link to `start_prev`.  For
/// every entry, in order:
///
/// 1. **Tenant** — it belongs to `tenant_id`.
/// 2. **Contiguity** — its `seq` is exactly one past the previous entry's.
/// 3. **Prev-hash linkage** — its `prev_hash` equals the previous entry's
///    stored `hash` (or `start_prev` for the first).
/// 4. **Hash correctness** — its stored `hash` matches the value recomputed
///    from its own fields.
pub fn walk_chain(
    sealer: &dyn EntrySealer,
    tenant_id: &TenantId,
    start_seq: u64,
    start_prev: &str,
    entries: &[AuditEntry],
) -> LedgerResult<ChainWalk> {
    let mut expected_seq = start_seq;
    let mut expected_prev = start_prev.to_string();
    let mut walk = ChainWalk {
        checked: 0,
        terminal_hash: None,
        chain_break: None,
    };

    for entry in entries {
        let kind = if &entry.tenant_id != tenant_id {
            Some(BreakKind::ForeignTenant {
                found: entry.tenant_id.clone(),
            })
        } else if entry.seq != expected_seq {
            Some(BreakKind::SequenceGap {
                expected_seq,
                actual_seq: entry.seq,
            })
        } else if entry.prev_hash != expected_prev {
            Some(BreakKind::PrevHashMismatch {
                expected: expected_prev.clone(),
                actual: entry.prev_hash.clone(),
            })
        } else {
            let recomputed = sealer.compute_hash(entry)?;
            if recomputed != entry.hash {
                Some(BreakKind::HashMismatch {
                    expected: recomputed,
                    actual: entry.hash.clone(),
                })
            } else {
                None
            }
        };

        if let Some(kind) = kind {
            walk.chain_break = Some(ChainBreak {
                seq: expected_seq,
                kind,
            });
            return Ok(walk);
        }

        walk.checked += 1;
        walk.terminal_hash = Some(entry.hash.clone());
        expected_prev = entry.hash.clone();
        expected_seq += 1;
    }

    Ok(walk)
}

/// True if `entries` form an intact chain of a single tenant from genesis.
///
/// An empty slice is defined as valid.
pub fn verify_chain(sealer: &dyn EntrySealer, entries: &[AuditEntry]) -> LedgerResult<bool> {
    let Some(first) = entries.first() else {
        return Ok(true);
    };
    let walk = walk_chain(
        sealer,
        &first.tenant_id,
        1,
        AuditEntry::GENESIS_HASH,
        entries,
    )?;
    Ok(walk.chain_break.is_none())
}
