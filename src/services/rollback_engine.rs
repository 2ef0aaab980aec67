use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{AllocationPreferences, HistoryKind};
use crate::services::{AllocationPlanner, Executor, LockManager};
use crate::store::{BinStore, HistoryStore};

/// Applies the inverse of a committed put-away or pick, per §4.7.
/// Best-effort: never creates bins, never violates capacity, and a
/// `PUTAWAY` reversal that can't find the original stock asks for manual
/// intervention rather than guessing at a replacement bin.
pub struct RollbackEngine {
    store: Arc<dyn BinStore>,
    history: Arc<dyn HistoryStore>,
    locks: Arc<LockManager>,
    executor: Executor,
}

impl RollbackEngine {
    pub fn new(
        store: Arc<dyn BinStore>,
        history: Arc<dyn HistoryStore>,
        locks: Arc<LockManager>,
        executor: Executor,
    ) -> Self {
        Self {
            store,
            history,
            locks,
            executor,
        }
    }

    pub async fn rollback(&self, entry_id: &str) -> EngineResult<()> {
        let entry = self.history.get_history_entry(entry_id).await?;
        if entry.rolled_back {
            return Err(EngineError::RollbackFailed {
                entry_id: entry_id.to_string(),
                reason: "history entry is already rolled back".to_string(),
            });
        }

        match entry.kind {
            HistoryKind::Putaway => self.rollback_putaway(&entry).await,
            HistoryKind::Pick => self.rollback_pick(&entry).await,
        }
    }

    /// Decrements the bin the stock was placed into. Fails outright,
    /// without touching anything, if the SKU is no longer there in
    /// sufficient quantity — the source's conservative reading of an
    /// ambiguous reversal (§9 Open Questions).
    async fn rollback_putaway(&self, entry: &crate::models::HistoryEntry) -> EngineResult<()> {
        let bin = self.store.get_bin(&entry.bin_id).await?;
        let available = bin.quantity_of(&entry.sku);
        if available < entry.quantity {
            return Err(EngineError::RollbackFailed {
                entry_id: entry.entry_id.clone(),
                reason: format!(
                    "bin {} now holds {} of {}, less than the {} placed — manual intervention required",
                    bin.code, available, entry.sku, entry.quantity
                ),
            });
        }

        self.apply_decrement(&bin.bin_id, &entry.sku, entry.quantity)
            .await?;
        self.history.mark_rolled_back(&entry.entry_id).await?;
        tracing::info!(entry_id = %entry.entry_id, bin_code = %bin.code, "rolled back put-away");
        Ok(())
    }

    async fn apply_decrement(&self, bin_id: &str, sku: &crate::models::Sku, qty: u32) -> EngineResult<()> {
        self.apply_decrement_attempt(bin_id, sku, qty, true).await
    }

    fn apply_decrement_attempt<'a>(
        &'a self,
        bin_id: &'a str,
        sku: &'a crate::models::Sku,
        qty: u32,
        retry_on_conflict: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let bin = self.store.get_bin(bin_id).await?;
            let (new_content, _) = bin
                .content
                .pick(sku, qty)
                .ok_or_else(|| EngineError::RollbackFailed {
                    entry_id: bin_id.to_string(),
                    reason: "sku no longer present in sufficient quantity".to_string(),
                })?;
            let mut new_state = bin.clone();
            new_state.content = new_content;
            new_state.refresh_status();

            match self.store.update_bin(bin_id, new_state, bin.version, None).await {
                Ok(_) => Ok(()),
                Err(EngineError::VersionConflict { .. }) if retry_on_conflict => {
                    self.apply_decrement_attempt(bin_id, sku, qty, false).await
                }
                Err(err) => Err(err),
            }
        })
    }

    /// Returns `quantity` of `sku` to the original bin when there's room,
    /// otherwise re-plans new destination(s) via `AllocationPlanner` and
    /// applies put-aways there. Each relocated portion is recorded as a
    /// fresh PUTAWAY history entry; the original PICK entry is marked
    /// `rolled_back` only once the full quantity has been placed somewhere.
    async fn rollback_pick(&self, entry: &crate::models::HistoryEntry) -> EngineResult<()> {
        let original = self.store.get_bin(&entry.bin_id).await?;

        let fits_original = original.is_eligible()
            && original.free_space() >= entry.quantity
            && (original.content.is_empty() || original.contains_sku(&entry.sku));

        if fits_original {
            self.executor
                .apply_putaway(
                    &entry.warehouse_id,
                    &entry.bin_id,
                    &entry.sku,
                    entry.quantity,
                    Default::default(),
                )
                .await?;
            self.history.mark_rolled_back(&entry.entry_id).await?;
            tracing::info!(entry_id = %entry.entry_id, bin_code = %original.code, "rolled back pick to original bin");
            return Ok(());
        }

        let bins = self.store.list_bins(&entry.warehouse_id).await?;
        let all_ids: Vec<String> = bins.iter().map(|b| b.bin_id.clone()).collect();
        let locked: HashSet<String> = self
            .locks
            .is_locked(&entry.warehouse_id, &all_ids)
            .locked_bins
            .into_iter()
            .collect();

        let plan = AllocationPlanner::plan(
            &bins,
            &locked,
            &entry.sku,
            entry.quantity,
            &AllocationPreferences::default(),
        );

        for plan_entry in &plan.entries {
            self.executor
                .apply_putaway(
                    &entry.warehouse_id,
                    &plan_entry.bin_id,
                    &entry.sku,
                    plan_entry.quantity,
                    Default::default(),
                )
                .await?;
        }

        if !plan.is_fully_allocated() {
            tracing::warn!(
                entry_id = %entry.entry_id,
                placed = plan.total_allocated,
                short = plan.remaining_quantity,
                "pick rollback only partially relocated stock"
            );
            return Err(EngineError::RollbackFailed {
                entry_id: entry.entry_id.clone(),
                reason: format!(
                    "relocated {} of {}; {} unit(s) found no room — manual intervention required",
                    plan.total_allocated, entry.quantity, plan.remaining_quantity
                ),
            });
        }

        self.history.mark_rolled_back(&entry.entry_id).await?;
        tracing::info!(entry_id = %entry.entry_id, "rolled back pick via new destination(s)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bin, BinContent, Sku, SkuRecord};
    use crate::store::{InMemoryBinStore, InMemoryHistoryStore};
    use crate::utils::{SequentialIdGen, SystemClock};
    use chrono::Utc;

    fn setup() -> (Arc<InMemoryBinStore>, Arc<InMemoryHistoryStore>, RollbackEngine) {
        let locks = Arc::new(LockManager::new(600));
        let store = Arc::new(InMemoryBinStore::new(locks.clone()));
        let history = Arc::new(InMemoryHistoryStore::new());
        let clock = Arc::new(SystemClock);
        let id_gen = Arc::new(SequentialIdGen::new("hist"));
        let executor = Executor::new(store.clone(), history.clone(), clock, id_gen);
        let engine = RollbackEngine::new(store.clone(), history.clone(), locks, executor);
        (store, history, engine)
    }

    #[tokio::test]
    async fn rollback_putaway_decrements_bin_and_marks_entry() {
        let (store, history, engine) = setup();
        let mut bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 10, Utc::now());
        bin.content = BinContent::Pure(SkuRecord::new(Sku::new("SKU001"), 5));
        bin.refresh_status();
        store.seed(bin);

        let entry_id = "hist-seed".to_string();
        history
            .append_history(crate::models::HistoryEntry {
                entry_id: entry_id.clone(),
                kind: HistoryKind::Putaway,
                timestamp: Utc::now(),
                warehouse_id: "WH1".into(),
                sku: Sku::new("SKU001"),
                quantity: 5,
                bin_id: "bin-1".into(),
                bin_code: "B1".into(),
                previous_qty: 0,
                new_qty: 5,
                allocation_type: None,
                fifo_reason: None,
                was_mixed: Some(false),
                operation_id: String::new(),
                rolled_back: false,
            })
            .await
            .unwrap();

        engine.rollback(&entry_id).await.unwrap();

        let bin = store.get_bin("bin-1").await.unwrap();
        assert_eq!(bin.current_qty(), 0);
        let entry = history.get_history_entry(&entry_id).await.unwrap();
        assert!(entry.rolled_back);
    }

    #[tokio::test]
    async fn rollback_putaway_fails_when_stock_already_moved() {
        let (store, history, engine) = setup();
        let bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 10, Utc::now());
        store.seed(bin);

        let entry_id = "hist-seed".to_string();
        history
            .append_history(crate::models::HistoryEntry {
                entry_id: entry_id.clone(),
                kind: HistoryKind::Putaway,
                timestamp: Utc::now(),
                warehouse_id: "WH1".into(),
                sku: Sku::new("SKU001"),
                quantity: 5,
                bin_id: "bin-1".into(),
                bin_code: "B1".into(),
                previous_qty: 0,
                new_qty: 5,
                allocation_type: None,
                fifo_reason: None,
                was_mixed: Some(false),
                operation_id: String::new(),
                rolled_back: false,
            })
            .await
            .unwrap();

        let result = engine.rollback(&entry_id).await;
        assert!(matches!(result, Err(EngineError::RollbackFailed { .. })));
    }

    #[tokio::test]
    async fn rollback_pick_returns_stock_to_original_bin() {
        let (store, history, engine) = setup();
        let mut bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 10, Utc::now());
        bin.content = BinContent::Pure(SkuRecord::new(Sku::new("SKU001"), 2));
        bin.refresh_status();
        store.seed(bin);

        let entry_id = "hist-seed".to_string();
        history
            .append_history(crate::models::HistoryEntry {
                entry_id: entry_id.clone(),
                kind: HistoryKind::Pick,
                timestamp: Utc::now(),
                warehouse_id: "WH1".into(),
                sku: Sku::new("SKU001"),
                quantity: 3,
                bin_id: "bin-1".into(),
                bin_code: "B1".into(),
                previous_qty: 5,
                new_qty: 2,
                allocation_type: None,
                fifo_reason: None,
                was_mixed: Some(false),
                operation_id: "op-1".into(),
                rolled_back: false,
            })
            .await
            .unwrap();

        engine.rollback(&entry_id).await.unwrap();

        let bin = store.get_bin("bin-1").await.unwrap();
        assert_eq!(bin.current_qty(), 5);
        let entry = history.get_history_entry(&entry_id).await.unwrap();
        assert!(entry.rolled_back);
    }

    #[tokio::test]
    async fn rollback_pick_relocates_when_original_bin_has_no_room() {
        let (store, history, engine) = setup();
        let mut original = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 5, Utc::now());
        original.content = BinContent::Pure(SkuRecord::new(Sku::new("SKU002"), 5));
        original.refresh_status();
        store.seed(original);
        let other = Bin::new_empty("bin-2", "B2", "WH1", "R1", 1, 2, 10, Utc::now());
        store.seed(other);

        let entry_id = "hist-seed".to_string();
        history
            .append_history(crate::models::HistoryEntry {
                entry_id: entry_id.clone(),
                kind: HistoryKind::Pick,
                timestamp: Utc::now(),
                warehouse_id: "WH1".into(),
                sku: Sku::new("SKU001"),
                quantity: 4,
                bin_id: "bin-1".into(),
                bin_code: "B1".into(),
                previous_qty: 4,
                new_qty: 0,
                allocation_type: None,
                fifo_reason: None,
                was_mixed: Some(false),
                operation_id: "op-1".into(),
                rolled_back: false,
            })
            .await
            .unwrap();

        engine.rollback(&entry_id).await.unwrap();

        let relocated = store.get_bin("bin-2").await.unwrap();
        assert_eq!(relocated.quantity_of(&Sku::new("SKU001")), 4);
        let entry = history.get_history_entry(&entry_id).await.unwrap();
        assert!(entry.rolled_back);
    }
}
