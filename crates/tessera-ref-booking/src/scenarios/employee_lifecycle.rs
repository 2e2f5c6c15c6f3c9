//! Scenario: Employee Lifecycle
//!
//! Tenant `T1` hires Ana, renames her, then removes her from the directory.
//!
//!   1. `Employee.create`  after  = {name: "Ana"}
//!   2. `Employee.update`  before = {name: "Ana"}, after = {name: "Ana Silva"}
//!   3. `Employee.delete`  before = {name: "Ana Silva"}
//!
//! The chain must hold exactly three linked entries and verify cleanly.

use std::sync::Arc;

use tessera_config::LedgerConfig;
use tessera_contracts::{
    entry::{Actor, AuditEntry, TenantId},
    error::LedgerResult,
    verify::VerificationReport,
};

use crate::{
    directory::{DirectoryError, EmployeeDirectory},
    mock_data,
    runtime::in_memory_ledger,
};

#[derive(Debug)]
pub struct LifecycleOutcome {
    pub entries: Vec<AuditEntry>,
    pub report: VerificationReport,
}

pub fn run_scenario(config: &LedgerConfig) -> LedgerResult<LifecycleOutcome> {
    println!("=== Scenario: Employee Lifecycle ===");
    println!();

    let (_store, ledger) = in_memory_ledger(config);
    let directory = EmployeeDirectory::new(Arc::new(ledger));
    let tenant = mock_data::tenant_one();
    let actor = mock_data::office_manager();

    let entries = record_lifecycle(&directory, &tenant, &actor)?;
    for entry in &entries {
        println!(
            "  seq {}  {:<16} hash {}  prev {}",
            entry.seq,
            entry.action,
            short(&entry.hash),
            short(&entry.prev_hash)
        );
    }
    println!();

    let report = directory.ledger().verify(&tenant, 1)?;
    println!(
        "  Chain verification:  {} ({} of {} entries checked)",
        if report.is_intact() { "VERIFIED" } else { "BROKEN" },
        report.entries_checked,
        report.through_seq
    );
    println!();
    println!("  Scenario complete.");
    println!();

    Ok(LifecycleOutcome { entries, report })
}

/// Hire, rename, and remove Ana, returning the three audit entries.
pub(crate) fn record_lifecycle(
    directory: &EmployeeDirectory,
    tenant: &TenantId,
    actor: &Actor,
) -> LedgerResult<Vec<AuditEntry>> {
    Ok(vec![
        directory
            .create(tenant, actor, mock_data::ana())
            .map_err(DirectoryError::into_ledger_error)?,
        directory
            .rename(tenant, actor, "emp-001", "Ana Silva")
            .map_err(DirectoryError::into_ledger_error)?,
        directory
            .delete(tenant, actor, "emp-001")
            .map_err(DirectoryError::into_ledger_error)?,
    ])
}

pub(crate) fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
