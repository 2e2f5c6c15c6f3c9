//! Audit entry and actor types.
//!
//! `AuditEntry` is one link in a tenant's hash chain.  Entries are immutable
//! once appended: the stores expose no way to modify them and the verifier
//! detects any out-of-band edit.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of an isolated customer or organization.
///
/// Chains, queries, and verification never cross this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque unique identifier of an entry.
///
/// A UUIDv7, minted while the tenant's chain slot is held, so ids sort in
/// append order within a tenant.  `seq` remains the authoritative position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub uuid::Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of principal that performed an action.
///
/// An open enumeration: the well-known kinds have variants, anything else is
/// preserved verbatim in `Other`.  Serialized as a plain lowercase string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActorType {
    User,
    ServiceAccount,
    System,
    Other(String),
}

impl ActorType {
    pub fn as_str(&self) -> &str {
        match self {
            ActorType::User => "user",
            ActorType::ServiceAccount => "service_account",
            ActorType::System => "system",
            ActorType::Other(s) => s,
        }
    }
}

impl From<String> for ActorType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user" => ActorType::User,
            "service_account" => ActorType::ServiceAccount,
            "system" => ActorType::System,
            _ => ActorType::Other(s),
        }
    }
}

impl From<ActorType> for String {
    fn from(t: ActorType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub actor_type: ActorType,
    pub name: String,
    pub email: Option<String>,
}

impl Actor {
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actor_type: ActorType::User,
            name: name.into(),
            email: None,
        }
    }

    pub fn system(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            actor_type: ActorType::System,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A single, hash-linked entry in a tenant's audit chain.
///
/// `hash` commits to every other field (including `metadata` and
/// `prev_hash`), so editing any of them, even one byte, is detected by the
/// verifier at this entry's `seq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: EntryId,
    pub tenant_id: TenantId,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub actor_name: String,
    pub actor_email: Option<String>,

    /// `"<Entity>.<verb>"`, e.g. `Employee.update` or `User.login`.
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,

    /// State prior to the action; `None` for creations.
    pub before: Option<Value>,
    /// State following the action; `None` for deletions.
    pub after: Option<Value>,
    pub metadata: Option<Value>,

    /// UTC, microsecond precision, non-decreasing within a tenant.
    pub created_at: DateTime<Utc>,

    /// Tenant-scoped chain position, starting at 1 with no gaps.
    pub seq: u64,

    /// `hash` of entry `seq - 1`, or `GENESIS_HASH` when `seq == 1`.
    pub prev_hash: String,

    /// Lowercase hex digest of the canonical content followed by `prev_hash`.
    pub hash: String,
}

impl AuditEntry {
    /// The sentinel `prev_hash` of every tenant's first entry.
    pub const GENESIS_HASH: &'static str = "genesis";

    pub fn is_genesis(&self) -> bool {
        self.seq == 1 && self.prev_hash == Self::GENESIS_HASH
    }
}
