//! Booking-app reference scenarios.
//!
//! Each scenario wires a real ledger (sequencer, sealer, store, verifier)
//! over an in-memory store, drives it the way the booking app would, and
//! returns what it observed so callers and tests can check the outcome.

pub mod append_only;
pub mod concurrent_writers;
pub mod employee_lifecycle;
