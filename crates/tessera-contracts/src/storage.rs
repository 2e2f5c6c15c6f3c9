//! Storage-boundary operation and head types.
//!
//! Stores receive every raw operation as a `StorageOp` so that the
//! append-only guard sees updates and deletes before any backend does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{AuditEntry, TenantId};

/// A raw operation issued against ledger storage.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageOp {
    Insert(Box<AuditEntry>),
    Update {
        tenant_id: TenantId,
        seq: u64,
        replacement: Box<AuditEntry>,
    },
    Delete {
        tenant_id: TenantId,
        seq: u64,
    },
}

impl StorageOp {
    pub fn name(&self) -> &'static str {
        match self {
            StorageOp::Insert(_) => "insert",
            StorageOp::Update { .. } => "update",
            StorageOp::Delete { .. } => "delete",
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        match self {
            StorageOp::Insert(entry) => &entry.tenant_id,
            StorageOp::Update { tenant_id, .. } | StorageOp::Delete { tenant_id, .. } => tenant_id,
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            StorageOp::Insert(entry) => entry.seq,
            StorageOp::Update { seq, .. } | StorageOp::Delete { seq, .. } => *seq,
        }
    }
}

/// The last durable link of a tenant's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub seq: u64,
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

impl ChainHead {
    pub fn of(entry: &AuditEntry) -> Self {
        Self {
            seq: entry.seq,
            hash: entry.hash.clone(),
            created_at: entry.created_at,
        }
    }
}
