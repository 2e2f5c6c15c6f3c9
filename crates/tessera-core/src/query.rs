//! Read-only query surface over the ledger.

use std::sync::Arc;

use tracing::debug;

use tessera_config::QueryConfig;
use tessera_contracts::{
    entry::AuditEntry,
    error::{LedgerError, LedgerResult},
    query::{AuditQuery, Page, Pagination},
};

use crate::traits::LedgerStore;

/// Filtered, paginated, tenant-scoped reads.
///
/// Requires no coordination with writers: entries never change once
/// visible, so a page is always a consistent view of what existed when the
/// store answered.
pub struct QuerySurface {
    store: Arc<dyn LedgerStore>,
    config: QueryConfig,
}

impl QuerySurface {
    pub fn new(store: Arc<dyn LedgerStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn list(&self, query: &AuditQuery, pagination: Pagination) -> LedgerResult<Page<AuditEntry>> {
        if query.tenant_id.as_str().trim().is_empty() {
            return Err(LedgerError::validation("list requires a tenant_id"));
        }
        if let Some(range) = &query.time_range {
            if let (Some(from), Some(to)) = (range.from, range.to) {
                if from > to {
                    return Err(LedgerError::validation("time_range.from is after time_range.to"));
                }
            }
        }

        let limit = self.config.effective_limit(pagination.limit);
        let page = self.store.query(query, pagination.offset, limit)?;

        debug!(
            tenant_id = %query.tenant_id,
            offset = pagination.offset,
            limit,
            returned = page.items.len(),
            total = page.total,
            "audit entries listed"
        );
        Ok(page)
    }
}
