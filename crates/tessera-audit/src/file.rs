//! Durable, append-only JSON Lines implementation of `LedgerStore`.
//!
//! One entry per line, in append order.  The file is opened in append mode
//! and nothing in this module ever seeks a write, rewrites, or truncates it;
//! raw updates and deletes are stopped by the guard.  Each append is
//! `fsync`ed before it is acknowledged.
//!
//! An in-memory index of every tenant's chain is rebuilt when the file is
//! opened and is topped up from the file before every operation, so readers
//! see lines appended by other handles.  Every append holds an exclusive
//! advisory lock on the file from the refresh through the `fsync`, so
//! handles in other threads or processes cannot link onto the same head.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs2::FileExt;
use tracing::{debug, info, warn};

use tessera_contracts::{
    entry::{AuditEntry, TenantId},
    error::{LedgerError, LedgerResult},
    query::{AuditQuery, Page},
    storage::{ChainHead, StorageOp},
};
use tessera_core::traits::LedgerStore;

use crate::{
    guard::AppendOnlyGuard,
    memory::{page_of, range_of},
};

struct FileState {
    path: PathBuf,
    file: File,
    /// Bytes of complete lines already indexed.
    offset: u64,
    /// Bytes after `offset` that do not yet end in a newline.
    pending: usize,
    lines: usize,
    chains: HashMap<TenantId, Vec<AuditEntry>>,
}

impl FileState {
    /// Index any complete lines appended since the last call.
    fn refresh(&mut self) -> LedgerResult<()> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf)?;

        let mut parsed = Vec::new();
        let mut consumed = 0;
        let mut line_no = self.lines;
        while let Some(pos) = buf[consumed..].iter().position(|b| *b == b'\n') {
            let line = &buf[consumed..consumed + pos];
            line_no += 1;
            if !line.iter().all(|b| b.is_ascii_whitespace()) {
                let entry: AuditEntry = serde_json::from_slice(line).map_err(|e| {
                    LedgerError::storage(format!(
                        "malformed ledger record at {}:{}: {}",
                        self.path.display(),
                        line_no,
                        e
                    ))
                })?;
                parsed.push(entry);
            }
            consumed += pos + 1;
        }

        if !parsed.is_empty() {
            debug!(path = %self.path.display(), records = parsed.len(), "ledger file indexed");
        }
        for entry in parsed {
            self.chains
                .entry(entry.tenant_id.clone())
                .or_default()
                .push(entry);
        }
        self.offset += consumed as u64;
        self.lines = line_no;
        self.pending = buf.len() - consumed;
        Ok(())
    }

    fn head(&self, tenant_id: &TenantId) -> Option<ChainHead> {
        self.chains
            .get(tenant_id)
            .and_then(|c| c.last())
            .map(ChainHead::of)
    }
}

/// Exclusive OS-level lock on the ledger file, released on drop.
struct AppendLock {
    file: File,
    path: PathBuf,
}

impl AppendLock {
    fn acquire(state: &FileState) -> LedgerResult<Self> {
        let file = state.file.try_clone()?;
        FileExt::lock_exclusive(&file).map_err(|e| {
            LedgerError::storage(format!(
                "failed to lock ledger file '{}': {}",
                state.path.display(),
                e
            ))
        })?;
        Ok(Self {
            file,
            path: state.path.clone(),
        })
    }
}

impl Drop for AppendLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to unlock ledger file");
        }
    }
}

pub struct JsonlLedgerStore {
    state: Mutex<FileState>,
}

impl JsonlLedgerStore {
    /// Open (creating if needed) the ledger file at `path` and index it.
    ///
    /// Returns `LedgerError::Storage` if the file cannot be opened or holds
    /// a line that is not a valid entry.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| {
                LedgerError::storage(format!("failed to open ledger file '{}': {}", path.display(), e))
            })?;

        let mut state = FileState {
            path,
            file,
            offset: 0,
            pending: 0,
            lines: 0,
            chains: HashMap::new(),
        };
        state.refresh()?;

        info!(
            path = %state.path.display(),
            tenants = state.chains.len(),
            records = state.chains.values().map(Vec::len).sum::<usize>(),
            "ledger file opened"
        );
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.lock()
            .map(|s| s.path.clone())
            .unwrap_or_default()
    }

    /// Total entries across all tenants, including lines appended by other
    /// handles since the last operation.
    pub fn len(&self) -> usize {
        self.refreshed()
            .map(|s| s.chains.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a raw storage operation.
    ///
    /// Updates and deletes are rejected by the guard; the file is never
    /// opened for anything but appending.  An insert is linked against the
    /// head as read under the file lock and fails with
    /// `ConcurrencyConflict` if another writer got there first.
    pub fn execute(&self, op: StorageOp) -> LedgerResult<()> {
        let entry = AppendOnlyGuard::admit(op)?;
        let mut state = self.lock()?;
        let _exclusive = AppendLock::acquire(&state)?;
        state.refresh()?;

        if state.pending > 0 {
            return Err(LedgerError::storage(format!(
                "ledger file '{}' ends in an incomplete record ({} bytes); refusing to append",
                state.path.display(),
                state.pending
            )));
        }
        AppendOnlyGuard::check_link(state.head(&entry.tenant_id).as_ref(), &entry)?;

        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        state.file.write_all(&line)?;
        state.file.sync_data()?;

        state.offset += line.len() as u64;
        state.lines += 1;
        debug!(tenant_id = %entry.tenant_id, seq = entry.seq, "entry appended to ledger file");
        state
            .chains
            .entry(entry.tenant_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, FileState>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::storage(format!("ledger file lock poisoned: {}", e)))
    }

    fn refreshed(&self) -> LedgerResult<MutexGuard<'_, FileState>> {
        let mut state = self.lock()?;
        state.refresh()?;
        Ok(state)
    }
}

impl LedgerStore for JsonlLedgerStore {
    fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
        self.execute(StorageOp::Insert(Box::new(entry.clone())))
    }

    fn head(&self, tenant_id: &TenantId) -> LedgerResult<Option<ChainHead>> {
        Ok(self.refreshed()?.head(tenant_id))
    }

    fn get(&self, tenant_id: &TenantId, seq: u64) -> LedgerResult<Option<AuditEntry>> {
        let state = self.refreshed()?;
        Ok(state
            .chains
            .get(tenant_id)
            .and_then(|c| c.iter().find(|e| e.seq == seq))
            .cloned())
    }

    fn read_range(
        &self,
        tenant_id: &TenantId,
        from_seq: u64,
        through_seq: u64,
    ) -> LedgerResult<Vec<AuditEntry>> {
        let state = self.refreshed()?;
        Ok(range_of(state.chains.get(tenant_id), from_seq, through_seq))
    }

    fn query(&self, query: &AuditQuery, offset: usize, limit: usize) -> LedgerResult<Page<AuditEntry>> {
        let state = self.refreshed()?;
        Ok(page_of(state.chains.get(&query.tenant_id), query, offset, limit))
    }

    fn tenants(&self) -> LedgerResult<Vec<TenantId>> {
        let state = self.refreshed()?;
        let mut tenants: Vec<TenantId> = state.chains.keys().cloned().collect();
        tenants.sort();
        Ok(tenants)
    }
}
