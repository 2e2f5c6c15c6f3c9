//! # tessera-verify
//!
//! Read-only integrity audits for the Tessera ledger.
//!
//! This crate provides [`engine::SnapshotVerifier`], which implements the
//! [`tessera_core::traits::ChainVerifier`] trait.  It walks one tenant's
//! chain over a consistent snapshot and reports the first broken link with
//! the offending `seq` and the expected and stored values.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use tessera_verify::SnapshotVerifier;
//!
//! let verifier = SnapshotVerifier::new(store.clone(), sealer.clone());
//! let report = verifier.verify(&TenantId::new("acme"), 1)?;
//! assert!(report.is_intact());
//! ```

pub mod engine;

pub use engine::SnapshotVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    use serde_json::json;

    use tessera_audit::{AppendOnlyGuard, ChainHasher};
    use tessera_config::LedgerConfig;
    use tessera_contracts::{
        entry::{Actor, AuditEntry, TenantId},
        error::{LedgerError, LedgerResult},
        query::{AuditQuery, Page},
        storage::ChainHead,
        verify::BreakKind,
    };
    use tessera_core::{
        traits::{ChainVerifier, EntrySealer, LedgerStore},
        AuditLedger,
    };

    use super::SnapshotVerifier;

    // ── Test store ────────────────────────────────────────────────────────────

    /// A flat store whose rows tests can edit behind the ledger's back.
    #[derive(Default)]
    struct EditableStore {
        rows: Mutex<Vec<AuditEntry>>,
    }

    impl EditableStore {
        fn edit(&self, tenant_id: &TenantId, seq: u64, f: impl FnOnce(&mut AuditEntry)) {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|e| &e.tenant_id == tenant_id && e.seq == seq)
                .unwrap();
            f(row);
        }

        fn remove(&self, tenant_id: &TenantId, seq: u64) {
            self.rows
                .lock()
                .unwrap()
                .retain(|e| !(&e.tenant_id == tenant_id && e.seq == seq));
        }

        fn chain(&self, tenant_id: &TenantId) -> Vec<AuditEntry> {
            let mut chain: Vec<AuditEntry> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|e| &e.tenant_id == tenant_id)
                .cloned()
                .collect();
            chain.sort_by_key(|e| e.seq);
            chain
        }
    }

    impl LedgerStore for EditableStore {
        fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
            let head = self.head(&entry.tenant_id)?;
            AppendOnlyGuard::check_link(head.as_ref(), entry)?;
            self.rows.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<ChainHead>> {
            Ok(self.chain(tenant_id).last().map(ChainHead::of))
        }

        fn get(&self, tenant_id: &TenantId, seq: u64) -> LedgerResult<Option<AuditEntry>> {
            Ok(self.chain(tenant_id).into_iter().find(|e| e.seq == seq))
        }

        fn read_range(
            &self,
            tenant_id: &TenantId,
            from_seq: u64,
            through_seq: u64,
        ) -> LedgerResult<Vec<AuditEntry>> {
            Ok(self
                .chain(tenant_id)
                .into_iter()
                .filter(|e| e.seq >= from_seq && e.seq <= through_seq)
                .collect())
        }

        fn query(&self, query: &AuditQuery, offset: usize, limit: usize) -> LedgerResult<Page<AuditEntry>> {
            let matched = self
                .chain(&query.tenant_id)
                .into_iter()
                .filter(|e| query.matches(e))
                .collect();
            Ok(Page::from_sorted(matched, offset, limit))
        }

        fn tenants(&self) -> LedgerResult<Vec<TenantId>> {
            let mut tenants: Vec<TenantId> =
                self.rows.lock().unwrap().iter().map(|e| e.tenant_id.clone()).collect();
            tenants.sort();
            tenants.dedup();
            Ok(tenants)
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    struct Fixture {
        store: Arc<EditableStore>,
        ledger: AuditLedger,
        verifier: SnapshotVerifier,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(EditableStore::default());
        let sealer: Arc<dyn EntrySealer> = Arc::new(ChainHasher::sha256());
        let dyn_store: Arc<dyn LedgerStore> = store.clone();
        let ledger = AuditLedger::new(
            Arc::clone(&dyn_store),
            Arc::clone(&sealer),
            Box::new(SnapshotVerifier::new(Arc::clone(&dyn_store), Arc::clone(&sealer))),
            &LedgerConfig::default(),
        );
        Fixture {
            store,
            ledger,
            verifier: SnapshotVerifier::new(dyn_store, sealer),
        }
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id)
    }

    fn log_logins(f: &Fixture, tenant_id: &TenantId, count: usize) -> Vec<AuditEntry> {
        let actor = Actor::user("u-1", "alice");
        (0..count)
            .map(|i| {
                f.ledger
                    .log_action(tenant_id, &actor, "User.login", None, Some(json!({ "n": i })))
                    .unwrap()
            })
            .collect()
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_intact_chain_verifies() {
        let f = fixture();
        let entries = log_logins(&f, &tenant("acme"), 5);

        let report = f.verifier.verify(&tenant("acme"), 1).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.from_seq, 1);
        assert_eq!(report.through_seq, 5);
        assert_eq!(report.entries_checked, 5);
        assert_eq!(report.terminal_hash.as_deref(), Some(entries[4].hash.as_str()));
        assert!(!report.anchored);
    }

    #[test]
    fn test_empty_chain_verifies() {
        let f = fixture();
        let report = f.verifier.verify(&tenant("nobody"), 1).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.through_seq, 0);
        assert_eq!(report.entries_checked, 0);
        assert!(report.terminal_hash.is_none());
    }

    #[test]
    fn test_zero_from_seq_rejected() {
        let f = fixture();
        assert!(matches!(
            f.verifier.verify(&tenant("acme"), 0),
            Err(LedgerError::Validation { .. })
        ));
    }

    #[test]
    fn test_partial_window_links_to_stored_predecessor() {
        let f = fixture();
        log_logins(&f, &tenant("acme"), 5);

        let report = f.verifier.verify(&tenant("acme"), 3).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.entries_checked, 3);
        assert!(!report.anchored);
    }

    #[test]
    fn test_window_past_head_is_empty() {
        let f = fixture();
        log_logins(&f, &tenant("acme"), 2);

        let report = f.verifier.verify(&tenant("acme"), 9).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.entries_checked, 0);
        assert_eq!(report.through_seq, 2);
    }

    #[test]
    fn test_edit_fails_at_its_seq_and_no_later() {
        let f = fixture();
        log_logins(&f, &tenant("acme"), 6);
        f.store.edit(&tenant("acme"), 4, |e| e.after = Some(json!({ "x": 1 })));

        let report = f.verifier.verify(&tenant("acme"), 1).unwrap();
        let chain_break = report.chain_break.unwrap();
        assert_eq!(chain_break.seq, 4);
        assert!(matches!(chain_break.kind, BreakKind::HashMismatch { .. }));
        assert_eq!(report.entries_checked, 3);

        let later = f.verifier.verify(&tenant("acme"), 5).unwrap();
        assert!(later.is_intact(), "entries after the edit still link to its stored hash");
    }

    #[test]
    fn test_edit_reports_expected_and_stored_hash() {
        let f = fixture();
        let entries = log_logins(&f, &tenant("acme"), 2);
        f.store.edit(&tenant("acme"), 2, |e| e.hash = "0".repeat(64));

        let chain_break = f.verifier.verify(&tenant("acme"), 1).unwrap().chain_break.unwrap();
        assert_eq!(
            chain_break.kind,
            BreakKind::HashMismatch {
                expected: entries[1].hash.clone(),
                actual: "0".repeat(64),
            }
        );
    }

    #[test]
    fn test_truncated_prefix_is_anchored() {
        let f = fixture();
        log_logins(&f, &tenant("acme"), 5);
        f.store.remove(&tenant("acme"), 1);
        f.store.remove(&tenant("acme"), 2);

        let anchored = f.verifier.verify(&tenant("acme"), 3).unwrap();
        assert!(anchored.is_intact());
        assert!(anchored.anchored);
        assert_eq!(anchored.entries_checked, 3);

        let from_genesis = f.verifier.verify(&tenant("acme"), 1).unwrap();
        assert_eq!(
            from_genesis.chain_break.unwrap().kind,
            BreakKind::SequenceGap {
                expected_seq: 1,
                actual_seq: 3
            }
        );
    }

    #[test]
    fn test_verification_is_tenant_scoped() {
        let f = fixture();
        log_logins(&f, &tenant("acme"), 3);
        log_logins(&f, &tenant("globex"), 2);
        f.store.edit(&tenant("globex"), 1, |e| e.actor_id = "u-9".into());

        assert!(f.verifier.verify(&tenant("acme"), 1).unwrap().is_intact());
        let broken = f.verifier.verify(&tenant("globex"), 1).unwrap();
        assert_eq!(broken.chain_break.unwrap().seq, 1);
    }

    #[test]
    fn test_growing_chain_reverifies_cleanly() {
        let f = fixture();
        log_logins(&f, &tenant("acme"), 3);
        let first = f.verifier.verify(&tenant("acme"), 1).unwrap();

        log_logins(&f, &tenant("acme"), 2);
        let second = f.verifier.verify(&tenant("acme"), 1).unwrap();

        assert_eq!(first.through_seq, 3);
        assert_eq!(second.through_seq, 5);
        assert!(first.is_intact() && second.is_intact());
    }

    #[test]
    fn test_verify_runs_alongside_live_writers() {
        let f = fixture();
        let acme = tenant("acme");
        log_logins(&f, &acme, 2);
        let writing = AtomicBool::new(true);

        let reports = thread::scope(|scope| {
            let writers: Vec<_> = (0..4).map(|_| scope.spawn(|| log_logins(&f, &acme, 10))).collect();
            let reader = scope.spawn(|| {
                let mut reports = Vec::new();
                while writing.load(Ordering::Acquire) {
                    reports.push(f.verifier.verify(&acme, 1).unwrap());
                }
                reports.push(f.verifier.verify(&acme, 1).unwrap());
                reports
            });
            for writer in writers {
                writer.join().unwrap();
            }
            writing.store(false, Ordering::Release);
            reader.join().unwrap()
        });

        assert!(reports.iter().all(|r| r.is_intact()));
        assert!(reports.iter().all(|r| r.entries_checked == r.through_seq));
        assert!(reports.windows(2).all(|w| w[0].through_seq <= w[1].through_seq));
        assert_eq!(reports.last().map(|r| r.through_seq), Some(42));
    }

    #[test]
    fn test_ledger_verify_strict_uses_snapshot_verifier() {
        let f = fixture();
        log_logins(&f, &tenant("acme"), 3);
        assert!(f.ledger.verify_strict(&tenant("acme"), 1).is_ok());

        f.store.edit(&tenant("acme"), 2, |e| e.action = "User.logout".into());
        match f.ledger.verify_strict(&tenant("acme"), 1) {
            Err(LedgerError::ChainIntegrity { seq, .. }) => assert_eq!(seq, 2),
            other => panic!("expected chain integrity error, got {:?}", other),
        }
    }
}
