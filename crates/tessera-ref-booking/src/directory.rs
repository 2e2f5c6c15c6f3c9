//! A small staff directory standing in for the booking app's CRUD handlers.
//!
//! Every mutation is audited before it is applied.  If the audit write
//! fails the directory is left untouched and the caller gets an error: there
//! is no mutation without its audit trail.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use tessera_contracts::{
    entry::{Actor, AuditEntry, TenantId},
    error::LedgerError,
};
use tessera_core::AuditLedger;

/// The audited entity name for directory records.
pub const ENTITY: &str = "Employee";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub department: Option<String>,
}

impl Employee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            department: None,
        }
    }

    pub fn in_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// The state recorded in `before`/`after`.  The id travels as `entity_id`.
    pub fn snapshot(&self) -> Value {
        let mut snapshot = json!({ "name": self.name });
        if let Some(department) = &self.department {
            snapshot["department"] = json!(department);
        }
        snapshot
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("employee '{id}' not found in tenant '{tenant_id}'")]
    NotFound { tenant_id: String, id: String },

    #[error("employee '{id}' already exists in tenant '{tenant_id}'")]
    AlreadyExists { tenant_id: String, id: String },

    /// The audit entry could not be written, so the mutation was not applied.
    #[error("audit write failed: {0}")]
    Audit(#[from] LedgerError),
}

impl DirectoryError {
    /// What an end user is shown.  Audit failures are reported as a plain
    /// failure with no ledger detail.
    pub fn user_message(&self) -> String {
        match self {
            DirectoryError::NotFound { id, .. } => format!("Employee {} was not found.", id),
            DirectoryError::AlreadyExists { id, .. } => format!("Employee {} already exists.", id),
            DirectoryError::Audit(_) => "The change could not be saved. Please try again.".to_string(),
        }
    }

    /// Collapse into the ledger's error type for callers that only speak it.
    pub fn into_ledger_error(self) -> LedgerError {
        match self {
            DirectoryError::Audit(e) => e,
            other => LedgerError::validation(other.to_string()),
        }
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

type Staff = BTreeMap<String, Employee>;

/// Staff records keyed by tenant.  Each tenant's records sit behind their
/// own lock, held across that tenant's audit write; the outer map lock is
/// only held to find or create a tenant's slot.
pub struct EmployeeDirectory {
    ledger: Arc<AuditLedger>,
    tenants: Mutex<HashMap<TenantId, Arc<Mutex<Staff>>>>,
}

impl EmployeeDirectory {
    pub fn new(ledger: Arc<AuditLedger>) -> Self {
        Self {
            ledger,
            tenants: Mutex::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<AuditLedger> {
        &self.ledger
    }

    pub fn create(&self, tenant_id: &TenantId, actor: &Actor, employee: Employee) -> DirectoryResult<AuditEntry> {
        let slot = self.slot(tenant_id)?;
        let mut staff = Self::lock(&slot)?;
        if staff.contains_key(&employee.id) {
            return Err(DirectoryError::AlreadyExists {
                tenant_id: tenant_id.to_string(),
                id: employee.id,
            });
        }

        let entry = self
            .ledger
            .log_create(tenant_id, actor, ENTITY, &employee.id, employee.snapshot())
            .map_err(|e| Self::rejected(tenant_id, "create", e))?;

        info!(tenant_id = %tenant_id, employee_id = %employee.id, seq = entry.seq, "employee created");
        staff.insert(employee.id.clone(), employee);
        Ok(entry)
    }

    pub fn rename(
        &self,
        tenant_id: &TenantId,
        actor: &Actor,
        id: &str,
        new_name: &str,
    ) -> DirectoryResult<AuditEntry> {
        let slot = self.slot(tenant_id)?;
        let mut staff = Self::lock(&slot)?;
        let current = Self::find(&staff, tenant_id, id)?.clone();
        let updated = Employee {
            name: new_name.to_string(),
            ..current.clone()
        };

        let entry = self
            .ledger
            .log_update(tenant_id, actor, ENTITY, id, current.snapshot(), updated.snapshot())
            .map_err(|e| Self::rejected(tenant_id, "update", e))?;

        staff.insert(id.to_string(), updated);
        Ok(entry)
    }

    pub fn delete(&self, tenant_id: &TenantId, actor: &Actor, id: &str) -> DirectoryResult<AuditEntry> {
        let slot = self.slot(tenant_id)?;
        let mut staff = Self::lock(&slot)?;
        let current = Self::find(&staff, tenant_id, id)?.clone();

        let entry = self
            .ledger
            .log_delete(tenant_id, actor, ENTITY, id, current.snapshot())
            .map_err(|e| Self::rejected(tenant_id, "delete", e))?;

        staff.remove(id);
        Ok(entry)
    }

    /// Record a sign-in.  Nothing in the directory changes.
    pub fn sign_in(&self, tenant_id: &TenantId, actor: &Actor, source_ip: &str) -> DirectoryResult<AuditEntry> {
        Ok(self.ledger.log_action(
            tenant_id,
            actor,
            "User.login",
            Some(("User", actor.id.as_str())),
            Some(json!({ "ip": source_ip })),
        )?)
    }

    pub fn get(&self, tenant_id: &TenantId, id: &str) -> Option<Employee> {
        let slot = self.existing_slot(tenant_id)?;
        let staff = Self::lock(&slot).ok()?;
        staff.get(id).cloned()
    }

    /// Current staff of `tenant_id`, ordered by id.
    pub fn list(&self, tenant_id: &TenantId) -> Vec<Employee> {
        let Some(slot) = self.existing_slot(tenant_id) else {
            return Vec::new();
        };
        let staff = match Self::lock(&slot) {
            Ok(staff) => staff,
            Err(_) => return Vec::new(),
        };
        staff.values().cloned().collect()
    }

    fn slot(&self, tenant_id: &TenantId) -> DirectoryResult<Arc<Mutex<Staff>>> {
        let mut tenants = self
            .tenants
            .lock()
            .map_err(|e| LedgerError::storage(format!("directory lock poisoned: {}", e)))?;
        Ok(Arc::clone(tenants.entry(tenant_id.clone()).or_default()))
    }

    fn existing_slot(&self, tenant_id: &TenantId) -> Option<Arc<Mutex<Staff>>> {
        self.tenants.lock().ok()?.get(tenant_id).cloned()
    }

    fn find<'s>(staff: &'s Staff, tenant_id: &TenantId, id: &str) -> DirectoryResult<&'s Employee> {
        staff.get(id).ok_or_else(|| DirectoryError::NotFound {
            tenant_id: tenant_id.to_string(),
            id: id.to_string(),
        })
    }

    fn rejected(tenant_id: &TenantId, operation: &str, e: LedgerError) -> DirectoryError {
        warn!(tenant_id = %tenant_id, operation, error = %e, "mutation abandoned: audit write failed");
        DirectoryError::Audit(e)
    }

    fn lock(slot: &Mutex<Staff>) -> DirectoryResult<MutexGuard<'_, Staff>> {
        slot.lock()
            .map_err(|e| LedgerError::storage(format!("directory lock poisoned: {}", e)).into())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
