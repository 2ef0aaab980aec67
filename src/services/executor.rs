use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{HistoryEntry, HistoryKind, Sku};
use crate::store::{BinStore, HistoryStore};
use crate::utils::{Clock, IdGen};

/// Applies put-away and pick plan entries to the store one at a time,
/// maintaining the content/quantity invariants of §3 and retrying once on
/// `StaleState`/`VersionConflict` per §7. Executor mutations are the only
/// place bins change; planners never mutate.
pub struct Executor {
    store: Arc<dyn BinStore>,
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    id_gen: Arc<dyn IdGen>,
}

/// Lot metadata carried on a put-away request.
#[derive(Debug, Clone, Default)]
pub struct LotInfo {
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub lot_date: Option<NaiveDate>,
}

impl Executor {
    pub fn new(
        store: Arc<dyn BinStore>,
        history: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
    ) -> Self {
        Self {
            store,
            history,
            clock,
            id_gen,
        }
    }

    /// Applies one put-away plan entry: `add_qty` of `sku` into `bin_id`.
    /// Put-away mutations are not associated with an operation id — they
    /// are rejected outright (`LockViolation`) if the bin is held by a
    /// live pick (§5).
    pub async fn apply_putaway(
        &self,
        warehouse_id: &str,
        bin_id: &str,
        sku: &Sku,
        add_qty: u32,
        lot: LotInfo,
    ) -> EngineResult<HistoryEntry> {
        self.apply_putaway_attempt(warehouse_id, bin_id, sku, add_qty, lot, true)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_putaway_attempt<'a>(
        &'a self,
        warehouse_id: &'a str,
        bin_id: &'a str,
        sku: &'a Sku,
        add_qty: u32,
        lot: LotInfo,
        retry_on_conflict: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<HistoryEntry>> + Send + 'a>>
    {
        Box::pin(async move {
            tracing::debug!(warehouse_id = %warehouse_id, bin_id = %bin_id, sku = %sku, add_qty, "planning put-away application");

            let bin = self.store.get_bin(bin_id).await?;
            if !bin.is_eligible() {
                return Err(EngineError::BinDisabled {
                    bin_id: bin_id.to_string(),
                });
            }

            let available_space = bin.free_space();
            if available_space < add_qty {
                return Err(EngineError::InsufficientCapacity {
                    sku: sku.clone(),
                    requested: add_qty,
                    available: available_space,
                });
            }

            let previous_qty = bin.current_qty();
            let (new_content, classification) = bin.content.put_away(
                sku,
                add_qty,
                lot.lot_number.clone(),
                lot.expiry_date,
                lot.lot_date,
            );

            let mut new_state = bin.clone();
            new_state.content = new_content;
            new_state.refresh_status();

            match self
                .store
                .update_bin(bin_id, new_state.clone(), bin.version, None)
                .await
            {
                Ok(committed) => {
                    let entry = HistoryEntry {
                        entry_id: self.id_gen.new_id(),
                        kind: HistoryKind::Putaway,
                        timestamp: self.clock.now(),
                        warehouse_id: warehouse_id.to_string(),
                        sku: sku.clone(),
                        quantity: add_qty,
                        bin_id: bin_id.to_string(),
                        bin_code: committed.code.clone(),
                        previous_qty,
                        new_qty: committed.current_qty(),
                        allocation_type: Some(classification),
                        fifo_reason: None,
                        was_mixed: Some(committed.is_mixed()),
                        operation_id: String::new(),
                        rolled_back: false,
                    };
                    self.history.append_history(entry.clone()).await?;
                    tracing::info!(
                        bin_code = %committed.code,
                        sku = %sku,
                        quantity = add_qty,
                        classification = classification.as_str(),
                        "committed put-away"
                    );
                    Ok(entry)
                }
                Err(EngineError::VersionConflict { .. }) if retry_on_conflict => {
                    tracing::warn!(bin_id = %bin_id, "version conflict on put-away, retrying once");
                    self.apply_putaway_attempt(warehouse_id, bin_id, sku, add_qty, lot, false)
                        .await
                }
                Err(err) => Err(err),
            }
        })
    }

    /// Applies one pick plan entry: `pick_qty` of `sku` from `bin_id`,
    /// under `operation_id`'s lock. Fails with `StaleState` if the bin no
    /// longer holds enough of `sku` — the caller (`BatchCoordinator`) is
    /// expected to re-plan and retry at a higher level; the executor
    /// itself only retries the narrower `VersionConflict` race.
    pub async fn apply_pick(
        &self,
        warehouse_id: &str,
        bin_id: &str,
        sku: &Sku,
        pick_qty: u32,
        operation_id: &str,
    ) -> EngineResult<HistoryEntry> {
        self.apply_pick_attempt(warehouse_id, bin_id, sku, pick_qty, operation_id, true)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_pick_attempt<'a>(
        &'a self,
        warehouse_id: &'a str,
        bin_id: &'a str,
        sku: &'a Sku,
        pick_qty: u32,
        operation_id: &'a str,
        retry_on_conflict: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<HistoryEntry>> + Send + 'a>>
    {
        Box::pin(async move {
            let bin = self.store.get_bin(bin_id).await?;
            if !bin.is_eligible() {
                return Err(EngineError::BinDisabled {
                    bin_id: bin_id.to_string(),
                });
            }

            let available = bin.quantity_of(sku);
            if available < pick_qty {
                return Err(EngineError::StaleState {
                    bin_id: bin_id.to_string(),
                });
            }

            let previous_qty = bin.current_qty();
            let was_mixed = bin.is_mixed();
            let (new_content, _) = bin
                .content
                .pick(sku, pick_qty)
                .ok_or_else(|| EngineError::StaleState {
                    bin_id: bin_id.to_string(),
                })?;

            let mut new_state = bin.clone();
            new_state.content = new_content;
            new_state.refresh_status();

            match self
                .store
                .update_bin(bin_id, new_state.clone(), bin.version, Some(operation_id))
                .await
            {
                Ok(committed) => {
                    let entry = HistoryEntry {
                        entry_id: self.id_gen.new_id(),
                        kind: HistoryKind::Pick,
                        timestamp: self.clock.now(),
                        warehouse_id: warehouse_id.to_string(),
                        sku: sku.clone(),
                        quantity: pick_qty,
                        bin_id: bin_id.to_string(),
                        bin_code: committed.code.clone(),
                        previous_qty,
                        new_qty: committed.current_qty(),
                        allocation_type: None,
                        fifo_reason: None,
                        was_mixed: Some(was_mixed),
                        operation_id: operation_id.to_string(),
                        rolled_back: false,
                    };
                    self.history.append_history(entry.clone()).await?;
                    tracing::info!(
                        bin_code = %committed.code,
                        sku = %sku,
                        quantity = pick_qty,
                        operation_id = %operation_id,
                        "committed pick"
                    );
                    Ok(entry)
                }
                Err(EngineError::VersionConflict { .. }) if retry_on_conflict => {
                    tracing::warn!(bin_id = %bin_id, "version conflict on pick, retrying once");
                    self.apply_pick_attempt(warehouse_id, bin_id, sku, pick_qty, operation_id, false)
                        .await
                }
                Err(err) => Err(err),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bin, BinContent, SkuRecord};
    use crate::services::LockManager;
    use crate::store::{InMemoryBinStore, InMemoryHistoryStore};
    use crate::utils::{SequentialIdGen, SystemClock};
    use chrono::Utc;

    fn setup() -> (Arc<InMemoryBinStore>, Executor) {
        let locks = Arc::new(LockManager::new(600));
        let store = Arc::new(InMemoryBinStore::new(locks));
        let history = Arc::new(InMemoryHistoryStore::new());
        let clock = Arc::new(SystemClock);
        let id_gen = Arc::new(SequentialIdGen::new("hist"));
        let executor = Executor::new(store.clone(), history, clock, id_gen);
        (store, executor)
    }

    #[tokio::test]
    async fn new_placement_into_empty_bin() {
        let (store, executor) = setup();
        let bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 10, Utc::now());
        store.seed(bin);

        let entry = executor
            .apply_putaway("WH1", "bin-1", &Sku::new("SKU001"), 5, LotInfo::default())
            .await
            .unwrap();

        assert_eq!(entry.new_qty, 5);
        let bin = store.get_bin("bin-1").await.unwrap();
        assert_eq!(bin.current_qty(), 5);
        assert!(!bin.is_mixed());
    }

    #[tokio::test]
    async fn mixed_storage_when_adding_different_sku() {
        let (store, executor) = setup();
        let mut bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 10, Utc::now());
        bin.content = BinContent::Pure(SkuRecord::new(Sku::new("SKU001"), 3));
        bin.refresh_status();
        store.seed(bin);

        let entry = executor
            .apply_putaway("WH1", "bin-1", &Sku::new("SKU002"), 4, LotInfo::default())
            .await
            .unwrap();

        assert_eq!(entry.new_qty, 7);
        let bin = store.get_bin("bin-1").await.unwrap();
        assert!(bin.is_mixed());
        assert_eq!(bin.quantity_of(&Sku::new("SKU001")), 3);
        assert_eq!(bin.quantity_of(&Sku::new("SKU002")), 4);
    }

    #[tokio::test]
    async fn pick_collapses_mixed_bin_to_pure_when_one_sku_remains() {
        let (store, executor) = setup();
        let mut bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 10, Utc::now());
        bin.content = BinContent::Mixed(vec![
            SkuRecord::new(Sku::new("SKU001"), 6),
            SkuRecord::new(Sku::new("SKU002"), 4),
        ]);
        bin.refresh_status();
        store.seed(bin);

        executor
            .apply_pick("WH1", "bin-1", &Sku::new("SKU001"), 6, "op-1")
            .await
            .unwrap();

        let bin = store.get_bin("bin-1").await.unwrap();
        assert!(!bin.is_mixed());
        assert_eq!(bin.quantity_of(&Sku::new("SKU002")), 4);
        assert_eq!(bin.current_qty(), 4);
    }

    #[tokio::test]
    async fn pick_more_than_available_is_stale_state() {
        let (store, executor) = setup();
        let mut bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 10, Utc::now());
        bin.content = BinContent::Pure(SkuRecord::new(Sku::new("SKU001"), 3));
        bin.refresh_status();
        store.seed(bin);

        let result = executor
            .apply_pick("WH1", "bin-1", &Sku::new("SKU001"), 5, "op-1")
            .await;

        assert!(matches!(result, Err(EngineError::StaleState { .. })));
    }

    #[tokio::test]
    async fn putaway_over_capacity_fails() {
        let (store, executor) = setup();
        let bin = Bin::new_empty("bin-1", "B1", "WH1", "R1", 1, 1, 3, Utc::now());
        store.seed(bin);

        let result = executor
            .apply_putaway("WH1", "bin-1", &Sku::new("SKU001"), 5, LotInfo::default())
            .await;

        assert!(matches!(
            result,
            Err(EngineError::InsufficientCapacity { .. })
        ));
    }
}
