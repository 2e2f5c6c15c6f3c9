//! Ledger wiring shared by the scenarios and the CLI.

use std::sync::Arc;

use tessera_audit::{ChainHasher, InMemoryLedgerStore, JsonlLedgerStore};
use tessera_config::LedgerConfig;
use tessera_contracts::error::{LedgerError, LedgerResult};
use tessera_core::{
    traits::{EntrySealer, LedgerStore},
    AuditLedger,
};
use tessera_verify::SnapshotVerifier;

/// Assemble an `AuditLedger` over `store` using the configured hash
/// algorithm and a snapshot verifier reading the same store.
pub fn build_ledger(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> AuditLedger {
    let sealer: Arc<dyn EntrySealer> = Arc::new(ChainHasher::new(config.hashing.algorithm));
    let verifier = SnapshotVerifier::new(Arc::clone(&store), Arc::clone(&sealer));
    AuditLedger::new(store, sealer, Box::new(verifier), config)
}

/// A ledger over a fresh in-memory store, plus a concrete handle to the
/// store for direct storage access.
pub fn in_memory_ledger(config: &LedgerConfig) -> (Arc<InMemoryLedgerStore>, AuditLedger) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = build_ledger(store.clone(), config);
    (store, ledger)
}

/// A ledger over the JSON Lines file named by `[storage] path`.
pub fn file_ledger(config: &LedgerConfig) -> LedgerResult<(Arc<JsonlLedgerStore>, AuditLedger)> {
    let path = config
        .storage
        .path
        .as_ref()
        .ok_or_else(|| LedgerError::Config {
            reason: "no ledger file configured ([storage] path)".to_string(),
        })?;
    let store = Arc::new(JsonlLedgerStore::open(path)?);
    let ledger = build_ledger(store.clone(), config);
    Ok((store, ledger))
}
