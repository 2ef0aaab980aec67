use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{Bin, HistoryEntry, HistoryFilter, WarehouseId};
use crate::services::LockManager;
use crate::store::{BinStore, HistoryStore};

/// Reference `BinStore` implementation backing the standalone crate (tests
/// and any caller that doesn't need a real persistence backend). Bins are
/// held in a concurrent map keyed by id; `update_bin` performs its
/// version/lock check and commit while holding the shard's exclusive
/// reference, so the compare-and-swap is atomic per bin without a
/// separate admission lock.
pub struct InMemoryBinStore {
    bins: DashMap<String, Bin>,
    locks: Arc<LockManager>,
}

impl InMemoryBinStore {
    pub fn new(locks: Arc<LockManager>) -> Self {
        Self {
            bins: DashMap::new(),
            locks,
        }
    }

    pub fn seed(&self, bin: Bin) {
        self.bins.insert(bin.bin_id.clone(), bin);
    }
}

#[async_trait]
impl BinStore for InMemoryBinStore {
    async fn get_bin(&self, bin_id: &str) -> EngineResult<Bin> {
        self.bins
            .get(bin_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::BinNotFound(bin_id.to_string()))
    }

    async fn list_bins(&self, warehouse_id: &WarehouseId) -> EngineResult<Vec<Bin>> {
        Ok(self
            .bins
            .iter()
            .filter(|entry| &entry.value().warehouse_id == warehouse_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn update_bin(
        &self,
        bin_id: &str,
        new_state: Bin,
        expected_version: u64,
        owner_operation_id: Option<&str>,
    ) -> EngineResult<Bin> {
        let mut entry = self
            .bins
            .get_mut(bin_id)
            .ok_or_else(|| EngineError::BinNotFound(bin_id.to_string()))?;

        if entry.version != expected_version {
            return Err(EngineError::VersionConflict {
                bin_id: bin_id.to_string(),
                expected: expected_version,
                found: entry.version,
            });
        }

        self.locks
            .validate(&entry.warehouse_id, &[bin_id.to_string()], owner_operation_id)?;

        let mut committed = new_state;
        committed.version = expected_version + 1;
        committed
            .check_invariants()
            .map_err(|reason| EngineError::IntegrityViolation {
                bin_id: bin_id.to_string(),
                reason,
            })?;

        *entry = committed.clone();
        tracing::debug!(bin_id = %bin_id, new_version = committed.version, "committed bin update");
        Ok(committed)
    }
}

/// Reference `HistoryStore` implementation: an append-only in-memory log.
pub struct InMemoryHistoryStore {
    entries: DashMap<String, HistoryEntry>,
    order: std::sync::Mutex<Vec<String>>,
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            order: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append_history(&self, entry: HistoryEntry) -> EngineResult<()> {
        let id = entry.entry_id.clone();
        self.entries.insert(id.clone(), entry);
        self.order.lock().expect("history order lock poisoned").push(id);
        Ok(())
    }

    async fn get_history_entry(&self, entry_id: &str) -> EngineResult<HistoryEntry> {
        self.entries
            .get(entry_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::HistoryNotFound(entry_id.to_string()))
    }

    async fn query_history(&self, filter: HistoryFilter) -> EngineResult<Vec<HistoryEntry>> {
        let order = self.order.lock().expect("history order lock poisoned").clone();
        Ok(order
            .into_iter()
            .filter_map(|id| self.entries.get(&id).map(|entry| entry.value().clone()))
            .filter(|entry| {
                filter
                    .warehouse_id
                    .as_ref()
                    .map_or(true, |w| &entry.warehouse_id == w)
                    && filter.sku.as_ref().map_or(true, |s| &entry.sku == s)
                    && filter.bin_id.as_ref().map_or(true, |b| &entry.bin_id == b)
                    && filter.kind.map_or(true, |k| entry.kind == k)
                    && filter
                        .operation_id
                        .as_ref()
                        .map_or(true, |op| &entry.operation_id == op)
                    && (filter.include_rolled_back || !entry.rolled_back)
            })
            .collect())
    }

    async fn mark_rolled_back(&self, entry_id: &str) -> EngineResult<()> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| EngineError::HistoryNotFound(entry_id.to_string()))?;
        entry.rolled_back = true;
        Ok(())
    }
}
