//! Scenario: Append-Only Storage
//!
//! After the employee lifecycle has written three entries for `T1`, a
//! caller bypasses the ledger and talks to the storage layer directly:
//!
//!   1. delete entry `seq = 2`            → `AppendOnlyViolation`
//!   2. overwrite entry `seq = 1`         → `AppendOnlyViolation`
//!   3. `list(T1)` still returns three entries, unchanged
//!   4. `verify(T1)` still succeeds

use std::sync::Arc;

use tessera_config::LedgerConfig;
use tessera_contracts::{
    entry::AuditEntry,
    error::LedgerResult,
    query::{AuditQuery, Pagination},
    storage::StorageOp,
    verify::VerificationReport,
};
use tessera_core::traits::LedgerStore;

use crate::{
    directory::EmployeeDirectory,
    mock_data,
    runtime::in_memory_ledger,
    scenarios::employee_lifecycle::record_lifecycle,
};

#[derive(Debug)]
pub struct AppendOnlyOutcome {
    pub delete_attempt: LedgerResult<()>,
    pub update_attempt: LedgerResult<()>,
    /// Entries returned by `list(T1)` after both attempts.
    pub listed: Vec<AuditEntry>,
    /// True when every stored entry is identical to what was first written.
    pub unchanged: bool,
    pub report: VerificationReport,
}

pub fn run_scenario(config: &LedgerConfig) -> LedgerResult<AppendOnlyOutcome> {
    println!("=== Scenario: Append-Only Storage ===");
    println!();

    let (store, ledger) = in_memory_ledger(config);
    let directory = EmployeeDirectory::new(Arc::new(ledger));
    let tenant = mock_data::tenant_one();

    let written = record_lifecycle(&directory, &tenant, &mock_data::office_manager())?;
    println!("  Lifecycle recorded: {} entries for {}", written.len(), tenant);
    println!();

    let delete_attempt = store.execute(StorageOp::Delete {
        tenant_id: tenant.clone(),
        seq: 2,
    });
    report_attempt("DELETE seq 2", &delete_attempt);

    let mut forged = written[0].clone();
    forged.after = Some(serde_json::json!({ "name": "Someone Else" }));
    let update_attempt = store.execute(StorageOp::Update {
        tenant_id: tenant.clone(),
        seq: 1,
        replacement: Box::new(forged),
    });
    report_attempt("UPDATE seq 1", &update_attempt);
    println!();

    let ledger = directory.ledger();
    let listed = ledger
        .list(&AuditQuery::for_tenant(tenant.clone()), Pagination::default())?
        .items;
    let unchanged = store.read_range(&tenant, 1, u64::MAX)? == written;
    let report = ledger.verify(&tenant, 1)?;

    println!("  list({}):             {} entries", tenant, listed.len());
    println!("  Stored entries:        {}", if unchanged { "UNCHANGED" } else { "MODIFIED" });
    println!(
        "  Chain verification:    {}",
        if report.is_intact() { "VERIFIED" } else { "BROKEN" }
    );
    println!();
    println!("  Scenario complete.");
    println!();

    Ok(AppendOnlyOutcome {
        delete_attempt,
        update_attempt,
        listed,
        unchanged,
        report,
    })
}

fn report_attempt(label: &str, attempt: &LedgerResult<()>) {
    match attempt {
        Ok(()) => println!("  {:<14} ACCEPTED (unexpected)", label),
        Err(e) => println!("  {:<14} REJECTED: {}", label, e),
    }
}
