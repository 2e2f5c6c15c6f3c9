//! # tessera-contracts
//!
//! Shared types, errors, and contracts for the Tessera audit ledger.
//!
//! All crates in the workspace import from here. No ledger logic lives in
//! this crate, only data definitions, small parsing helpers, and error types.

pub mod action;
pub mod entry;
pub mod error;
pub mod query;
pub mod storage;
pub mod verify;
