//! Read-side query types for browsing a tenant's ledger.
//!
//! `AuditQuery` cannot be built without a tenant: tenant isolation is part of
//! the type, not a filter callers may forget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{AuditEntry, TenantId};

/// Half-open time window `[from, to)`; either bound may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| *t >= from) && self.to.map_or(true, |to| *t < to)
    }
}

/// Filters for `list`.  All optional filters are conjunctive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub tenant_id: TenantId,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<String>,
    pub actor_id: Option<String>,
    pub time_range: Option<TimeRange>,
}

impl AuditQuery {
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            entity: None,
            entity_id: None,
            action: None,
            actor_id: None,
            time_range: None,
        }
    }

    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// True if `entry` belongs to this query's tenant and passes every filter.
    ///
    /// The tenant is checked first; nothing else is inspected for a foreign
    /// tenant's entry.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if entry.tenant_id != self.tenant_id {
            return false;
        }
        let eq = |filter: &Option<String>, value: Option<&str>| {
            filter.as_deref().map_or(true, |f| value == Some(f))
        };
        eq(&self.entity, entry.entity.as_deref())
            && eq(&self.entity_id, entry.entity_id.as_deref())
            && eq(&self.action, Some(entry.action.as_str()))
            && eq(&self.actor_id, Some(entry.actor_id.as_str()))
            && self
                .time_range
                .as_ref()
                .map_or(true, |r| r.contains(&entry.created_at))
    }
}

/// Offset pagination.  A `None` limit means "use the configured default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

/// One page of results, ordered by `(created_at, seq)` ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of matching items across all pages.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Slice an already-ordered, already-filtered result set.
    pub fn from_sorted(all: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = all.len();
        let items: Vec<T> = all.into_iter().skip(offset).take(limit).collect();
        let has_more = offset.saturating_add(items.len()) < total;
        Self {
            items,
            total,
            offset,
            limit,
            has_more,
        }
    }
}
