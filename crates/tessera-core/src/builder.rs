//! Audit entry construction.
//!
//! `EntryBuilder` validates an `ActionDescriptor`, then, given a chain
//! reservation, produces a fully populated and sealed `AuditEntry`.
//!
//! Validation rules:
//!
//! 1. `tenant_id`, `actor.id`, and `action` must be non-empty and the action
//!    may not contain whitespace or empty dot-separated segments.
//! 2. `create`/`update`/`delete` verbs need an entity prefix
//!    (`Employee.create`, not `create` or `*.create`), an `entity` equal to
//!    that prefix, and an `entity_id`.
//! 3. Snapshots must match the verb: `create` has no `before`, `delete` has
//!    no `after`, `update` has both.  A JSON `null` snapshot counts as absent.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde_json::Value;
use tracing::debug;

use tessera_contracts::{
    action::{split_action, ActionDescriptor, Verb},
    entry::{AuditEntry, EntryId},
    error::{LedgerError, LedgerResult},
};

use crate::{sequencer::Reservation, traits::EntrySealer};

/// Treat `Some(Value::Null)` the same as `None`.
fn present(v: &Option<Value>) -> Option<&Value> {
    v.as_ref().filter(|v| !v.is_null())
}

fn normalized(v: &Option<Value>) -> Option<Value> {
    present(v).cloned()
}

/// Builds sealed entries from action descriptors.
pub struct EntryBuilder {
    sealer: Arc<dyn EntrySealer>,
}

impl EntryBuilder {
    pub fn new(sealer: Arc<dyn EntrySealer>) -> Self {
        Self { sealer }
    }

    pub fn sealer(&self) -> &Arc<dyn EntrySealer> {
        &self.sealer
    }

    /// Reject malformed descriptors before any chain slot is taken.
    pub fn validate(descriptor: &ActionDescriptor) -> LedgerResult<()> {
        if descriptor.tenant_id.as_str().trim().is_empty() {
            return Err(LedgerError::validation("tenant_id must not be empty"));
        }
        if descriptor.actor.id.trim().is_empty() {
            return Err(LedgerError::validation("actor id must not be empty"));
        }

        let action = descriptor.action.as_str();
        if action.is_empty() {
            return Err(LedgerError::validation("action must not be empty"));
        }
        if action.chars().any(char::is_whitespace) {
            return Err(LedgerError::validation(format!(
                "action '{}' must not contain whitespace",
                action
            )));
        }
        if action.split('.').any(str::is_empty) {
            return Err(LedgerError::validation(format!(
                "action '{}' has an empty segment",
                action
            )));
        }

        let (prefix, verb) = split_action(action);
        let verb = Verb::parse(verb);
        if !verb.is_mutation() {
            return Ok(());
        }

        let prefix = match prefix {
            Some(p) if p != "*" => p,
            _ => {
                return Err(LedgerError::validation(format!(
                    "action '{}' must be qualified as '<Entity>.<verb>'",
                    action
                )))
            }
        };
        match descriptor.entity.as_deref() {
            Some(entity) if entity == prefix => {}
            Some(entity) => {
                return Err(LedgerError::validation(format!(
                    "entity '{}' does not match action prefix '{}'",
                    entity, prefix
                )))
            }
            None => {
                return Err(LedgerError::validation(format!(
                    "action '{}' requires an entity",
                    action
                )))
            }
        }
        if descriptor
            .entity_id
            .as_deref()
            .map_or(true, |id| id.trim().is_empty())
        {
            return Err(LedgerError::validation(format!(
                "action '{}' requires an entity_id",
                action
            )));
        }

        let before = present(&descriptor.before).is_some();
        let after = present(&descriptor.after).is_some();
        let consistent = match verb {
            Verb::Create => !before && after,
            Verb::Update => before && after,
            Verb::Delete => before && !after,
            Verb::Other(_) => true,
        };
        if !consistent {
            return Err(LedgerError::validation(format!(
                "'{}' requires {}; got before={} after={}",
                action,
                match verb {
                    Verb::Create => "after only",
                    Verb::Update => "both before and after",
                    _ => "before only",
                },
                if before { "present" } else { "null" },
                if after { "present" } else { "null" },
            )));
        }
        Ok(())
    }

    /// Produce the sealed entry occupying `reservation`'s position.
    ///
    /// `created_at` is truncated to microseconds and never earlier than the
    /// previous entry's timestamp.
    pub fn build(
        &self,
        descriptor: &ActionDescriptor,
        reservation: &Reservation,
    ) -> LedgerResult<AuditEntry> {
        if reservation.tenant_id() != &descriptor.tenant_id {
            return Err(LedgerError::validation(format!(
                "reservation for tenant '{}' cannot seal an entry for tenant '{}'",
                reservation.tenant_id(),
                descriptor.tenant_id
            )));
        }

        let now = Utc::now().trunc_subsecs(6);
        let created_at = match reservation.not_before() {
            Some(floor) if floor > now => floor,
            _ => now,
        };

        let mut entry = AuditEntry {
            id: EntryId::new(),
            tenant_id: descriptor.tenant_id.clone(),
            actor_id: descriptor.actor.id.clone(),
            actor_type: descriptor.actor.actor_type.clone(),
            actor_name: descriptor.actor.name.clone(),
            actor_email: descriptor.actor.email.clone(),
            action: descriptor.action.clone(),
            entity: descriptor.entity.clone(),
            entity_id: descriptor.entity_id.clone(),
            before: normalized(&descriptor.before),
            after: normalized(&descriptor.after),
            metadata: normalized(&descriptor.metadata),
            created_at,
            seq: reservation.seq(),
            prev_hash: reservation.prev_hash().to_string(),
            hash: String::new(),
        };
        entry.hash = self.sealer.compute_hash(&entry)?;

        debug!(
            tenant_id = %entry.tenant_id,
            seq = entry.seq,
            action = %entry.action,
            algorithm = self.sealer.algorithm(),
            "audit entry sealed"
        );
        Ok(entry)
    }
}
