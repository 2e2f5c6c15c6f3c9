//! Action descriptors: the inbound request to record one audited action.
//!
//! Business code describes *what happened*; the entry builder turns the
//! descriptor into a sealed, chain-linked `AuditEntry`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::{Actor, TenantId};

/// The verb portion of an action name.
///
/// Only the three CRUD verbs carry structural rules about `before`/`after`;
/// every other verb is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Create,
    Update,
    Delete,
    Other(String),
}

impl Verb {
    pub fn parse(verb: &str) -> Self {
        match verb {
            "create" => Verb::Create,
            "update" => Verb::Update,
            "delete" => Verb::Delete,
            other => Verb::Other(other.to_string()),
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Verb::Create | Verb::Update | Verb::Delete)
    }
}

/// Split `"Entity.verb"` at its last dot.
///
/// Returns `(None, verb)` for an unqualified action such as `"login"`.
pub fn split_action(action: &str) -> (Option<&str>, &str) {
    match action.rsplit_once('.') {
        Some((entity, verb)) => (Some(entity), verb),
        None => (None, action),
    }
}

/// Everything needed to record one action for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub tenant_id: TenantId,
    pub actor: Actor,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub metadata: Option<Value>,
}

impl ActionDescriptor {
    /// A non-CRUD action (login, logout, export, import, custom).
    pub fn new(tenant_id: TenantId, actor: Actor, action: impl Into<String>) -> Self {
        Self {
            tenant_id,
            actor,
            action: action.into(),
            entity: None,
            entity_id: None,
            before: None,
            after: None,
            metadata: None,
        }
    }

    /// `<entity>.create` with the created state.
    pub fn create(
        tenant_id: TenantId,
        actor: Actor,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
        after: Value,
    ) -> Self {
        let entity = entity.into();
        Self {
            action: format!("{entity}.create"),
            after: Some(after),
            ..Self::new(tenant_id, actor, String::new())
        }
        .with_entity(entity, entity_id)
    }

    /// `<entity>.update` with both snapshots.
    pub fn update(
        tenant_id: TenantId,
        actor: Actor,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
        before: Value,
        after: Value,
    ) -> Self {
        let entity = entity.into();
        Self {
            action: format!("{entity}.update"),
            before: Some(before),
            after: Some(after),
            ..Self::new(tenant_id, actor, String::new())
        }
        .with_entity(entity, entity_id)
    }

    /// `<entity>.delete` with the state that was removed.
    pub fn delete(
        tenant_id: TenantId,
        actor: Actor,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
        before: Value,
    ) -> Self {
        let entity = entity.into();
        Self {
            action: format!("{entity}.delete"),
            before: Some(before),
            ..Self::new(tenant_id, actor, String::new())
        }
        .with_entity(entity, entity_id)
    }

    pub fn with_entity(mut self, entity: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn verb(&self) -> Verb {
        Verb::parse(split_action(&self.action).1)
    }
}
