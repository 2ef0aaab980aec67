use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{EngineError, EngineResult};
use crate::models::{BinId, LockStatus, PickLock, WarehouseId};
use crate::utils::{Clock, SystemClock};

/// Process-local, per-bin advisory lock table scoped to pick operations.
///
/// Acquisition over a bin set is atomic: a single admission mutex guards
/// the check-then-insert across every key in the request, while the lock
/// table itself is a concurrent map (mirroring the pack's lock-table
/// idiom) so reads (`is_locked`, `validate`) never contend with each
/// other or with an in-flight acquire on unrelated bins.
///
/// When the persistence backend is multi-process, this table must be
/// promoted to the backend (a per-bin lock document with TTL, or a lease
/// service) — the contract here stays identical.
pub struct LockManager {
    locks: DashMap<(WarehouseId, BinId), PickLock>,
    admission: AsyncMutex<()>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl LockManager {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_clock(ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            locks: DashMap::new(),
            admission: AsyncMutex::new(()),
            ttl: Duration::seconds(ttl_secs as i64),
            clock,
        }
    }

    fn is_expired(&self, entry: &PickLock, now: DateTime<Utc>) -> bool {
        now >= entry.expires_at
    }

    /// Atomic over the bin set: if any bin is held by a different,
    /// non-expired operation, the whole call fails and no lock is taken.
    /// Re-acquiring bins already held by `operation_id` is a no-op that
    /// also resets their expiry.
    pub async fn acquire(
        &self,
        warehouse_id: &WarehouseId,
        bin_ids: &[BinId],
        operation_id: &str,
    ) -> EngineResult<()> {
        let _admission = self.admission.lock().await;
        let now = self.clock.now();

        let mut conflicts = Vec::new();
        for bin_id in bin_ids {
            let key = (warehouse_id.clone(), bin_id.clone());
            if let Some(entry) = self.locks.get(&key) {
                if entry.operation_id != operation_id && !self.is_expired(&entry, now) {
                    conflicts.push(bin_id.clone());
                }
            }
        }

        if !conflicts.is_empty() {
            tracing::warn!(
                warehouse_id = %warehouse_id,
                operation_id = %operation_id,
                conflicts = ?conflicts,
                "lock acquisition conflict"
            );
            return Err(EngineError::LockConflict { bins: conflicts });
        }

        let expires_at = now + self.ttl;
        for bin_id in bin_ids {
            let key = (warehouse_id.clone(), bin_id.clone());
            self.locks.insert(
                key,
                PickLock {
                    operation_id: operation_id.to_string(),
                    acquired_at: now,
                    expires_at,
                },
            );
        }

        tracing::debug!(
            warehouse_id = %warehouse_id,
            operation_id = %operation_id,
            bins = ?bin_ids,
            "acquired pick locks"
        );
        Ok(())
    }

    /// Releases only the locks owned by `operation_id`.
    pub async fn release(&self, warehouse_id: &WarehouseId, bin_ids: &[BinId], operation_id: &str) {
        let _admission = self.admission.lock().await;
        for bin_id in bin_ids {
            let key = (warehouse_id.clone(), bin_id.clone());
            let owned = self
                .locks
                .get(&key)
                .map(|entry| entry.operation_id == operation_id)
                .unwrap_or(false);
            if owned {
                self.locks.remove(&key);
            }
        }
    }

    pub fn is_locked(&self, warehouse_id: &WarehouseId, bin_ids: &[BinId]) -> LockStatus {
        let now = self.clock.now();
        let mut locked_bins = Vec::new();
        let mut locks = Vec::new();
        let mut owner = None;
        for bin_id in bin_ids {
            let key = (warehouse_id.clone(), bin_id.clone());
            if let Some(entry) = self.locks.get(&key) {
                if !self.is_expired(&entry, now) {
                    locked_bins.push(bin_id.clone());
                    owner = Some(entry.operation_id.clone());
                    locks.push(entry.clone());
                }
            }
        }
        LockStatus {
            locked: !locked_bins.is_empty(),
            locked_bins,
            owner,
            locks,
        }
    }

    /// Consulted by put-away paths: passes if `allowed_operation_id` owns
    /// every locked bin in `bin_ids` (or none of them are locked), fails
    /// otherwise.
    pub fn validate(
        &self,
        warehouse_id: &WarehouseId,
        bin_ids: &[BinId],
        allowed_operation_id: Option<&str>,
    ) -> EngineResult<()> {
        let now = self.clock.now();
        for bin_id in bin_ids {
            let key = (warehouse_id.clone(), bin_id.clone());
            if let Some(entry) = self.locks.get(&key) {
                if self.is_expired(&entry, now) {
                    continue;
                }
                let owns = allowed_operation_id
                    .map(|op| op == entry.operation_id)
                    .unwrap_or(false);
                if !owns {
                    return Err(EngineError::LockViolation {
                        bin_id: bin_id.clone(),
                        owner: entry.operation_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Emergency cleanup: releases every lock for a warehouse regardless
    /// of owner.
    pub async fn force_release_all(&self, warehouse_id: &WarehouseId) {
        let _admission = self.admission.lock().await;
        self.locks.retain(|(wid, _), _| wid != warehouse_id);
        tracing::warn!(warehouse_id = %warehouse_id, "force-released all pick locks");
    }

    /// Evicts expired entries. Intended to be driven by a periodic sweep
    /// task ([`spawn_sweeper`]); also safe to call directly from tests
    /// that advance a [`crate::utils::TestClock`] past the TTL.
    pub fn sweep_expired(&self) {
        let now = self.clock.now();
        self.locks.retain(|_, entry| entry.expires_at > now);
    }

    #[cfg(test)]
    pub(crate) fn held_count(&self) -> usize {
        self.locks.len()
    }
}

/// Spawns a background task that periodically evicts expired locks,
/// mirroring the source's async-runtime-native timer idiom (a
/// `tokio::time::interval` loop rather than per-lock sleep tasks).
/// Returns a handle the caller may abort on shutdown.
pub fn spawn_sweeper(
    manager: Arc<LockManager>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(StdDuration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            manager.sweep_expired();
        }
    })
}
