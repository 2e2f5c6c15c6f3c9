//! # tessera-config
//!
//! TOML-driven configuration for the Tessera audit ledger.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tessera_config::LedgerConfig;
//!
//! let config = LedgerConfig::from_file(Path::new("tessera.toml"))?;
//! ```
//!
//! Every field is optional; omitted values fall back to the defaults on
//! each section type.

pub mod config;
pub mod loader;

pub use config::{
    HashAlgorithm, HashingConfig, LedgerConfig, QueryConfig, RetryConfig, SequencerConfig,
    StorageConfig,
};

// ── Tests ─────────────────────────────────────────────────────────────────────
