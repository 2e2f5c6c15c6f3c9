//! # tessera-audit
//!
//! Tamper-evidence and storage for the Tessera ledger.
//!
//! ## Overview
//!
//! Every entry is serialized to a canonical byte form and sealed with
//! `digest(canonical || prev_hash)`, linking it to the entry before it in
//! its tenant's chain.  Editing any stored field, even a single byte, breaks
//! the chain at that entry and is detected by `walk_chain`.
//!
//! Two stores are provided.  Both route every raw operation through
//! `AppendOnlyGuard`, so updates and deletes are refused at the storage
//! boundary, and both treat `append` as a conditional insert that only
//! succeeds when the entry extends the current head.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera_audit::{ChainHasher, JsonlLedgerStore};
//!
//! let store = Arc::new(JsonlLedgerStore::open("ledger.jsonl")?);
//! let sealer = Arc::new(ChainHasher::sha256());
//! ```

pub mod canonical;
pub mod chain;
pub mod digest;
pub mod file;
pub mod guard;
pub mod memory;

pub use canonical::canonical_bytes;
pub use chain::{verify_chain, walk_chain, ChainHasher, ChainWalk};
pub use digest::{hash_function, HashFunction, Sha256Hash, Sha512Hash};
pub use file::JsonlLedgerStore;
pub use guard::AppendOnlyGuard;
pub use memory::InMemoryLedgerStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
