//! # tessera-ref-booking
//!
//! Booking-app reference runtime for the Tessera audit ledger.
//!
//! A small staff directory stands in for the booking app's CRUD handlers
//! and records every change through the ledger.  Three scenarios exercise
//! it with mock data:
//!
//! 1. **Employee Lifecycle** — create, update, and delete one employee and
//!    verify the resulting three-entry chain.
//! 2. **Append-Only Storage** — direct storage deletes and updates are
//!    refused and the chain is left intact.
//! 3. **Concurrent Writers** — many threads hire staff into two tenants at
//!    once; each tenant still gets one contiguous chain.
//!
//! All data is fictional.  No external systems are contacted.

pub mod directory;
pub mod mock_data;
pub mod runtime;
pub mod scenarios;

// ── Tests ─────────────────────────────────────────────────────────────────────
