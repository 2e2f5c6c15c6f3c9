//! Simulated booking-app data for the Tessera reference runtime.
//!
//! All names and identifiers are fictional.

use tessera_contracts::entry::{Actor, TenantId};

use crate::directory::Employee;

// ── Tenants ───────────────────────────────────────────────────────────────────

pub fn tenant_one() -> TenantId {
    TenantId::new("T1")
}

pub fn tenant_two() -> TenantId {
    TenantId::new("T2")
}

// ── Actors ────────────────────────────────────────────────────────────────────

/// The office manager who maintains the staff directory.
pub fn office_manager() -> Actor {
    Actor::user("usr-0042", "Marta Okafor").with_email("marta@clinic.example")
}

/// The nightly HR import job.
pub fn hr_sync() -> Actor {
    Actor::system("svc-hr-sync")
}

// ── Employees ─────────────────────────────────────────────────────────────────

pub fn ana() -> Employee {
    Employee::new("emp-001", "Ana")
}

/// A deterministic batch of new hires for the concurrent-writers scenario.
pub fn new_hires(count: usize) -> Vec<Employee> {
    const NAMES: [&str; 8] = [
        "Bruno", "Chiara", "Dmitri", "Esi", "Farid", "Grace", "Hiro", "Ines",
    ];
    (0..count)
        .map(|i| {
            Employee::new(
                format!("emp-{:03}", i + 100),
                format!("{} {}", NAMES[i % NAMES.len()], i + 1),
            )
            .in_department(if i % 2 == 0 { "front-desk" } else { "scheduling" })
        })
        .collect()
}
