use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AllocationPreferences, BatchLineItem, BatchResult, BatchSummary, LineResult, LineStatus,
    OperationType, PickedBin, Sku,
};
use crate::services::{AllocationPlanner, Executor, LockManager, PickPlanner};
use crate::store::BinStore;
use crate::utils::{Clock, IdGen};

/// Rejects a line before it ever reaches a planner: an empty barcode or a
/// non-positive quantity is a caller bug, not a stock shortfall, so it is
/// reported as [`EngineError::InvalidInput`] rather than folded into the
/// pre-flight availability math (§7 error taxonomy).
fn validate_line_item(item: &BatchLineItem) -> Result<Sku, EngineError> {
    if item.barcode.trim().is_empty() {
        return Err(EngineError::InvalidInput(
            "barcode must not be empty".to_string(),
        ));
    }
    if item.quantity == 0 {
        return Err(EngineError::InvalidInput(format!(
            "quantity for {} must be positive",
            item.barcode
        )));
    }
    Ok(item.sku())
}

/// Orchestrates a whole batch (many barcodes at once) over the planners and
/// the [`Executor`], per §4.6. Put-away and pick batches have different
/// all-or-nothing semantics and are exposed as two entry points rather than
/// one parameterized method, matching the source's split.
pub struct BatchCoordinator {
    store: Arc<dyn BinStore>,
    locks: Arc<LockManager>,
    executor: Executor,
    clock: Arc<dyn Clock>,
    id_gen: Arc<dyn IdGen>,
}

impl BatchCoordinator {
    pub fn new(
        store: Arc<dyn BinStore>,
        locks: Arc<LockManager>,
        executor: Executor,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
    ) -> Self {
        Self {
            store,
            locks,
            executor,
            clock,
            id_gen,
        }
    }

    fn locked_bin_ids(&self, warehouse_id: &str, bins: &[crate::models::Bin]) -> HashSet<String> {
        let all_ids: Vec<String> = bins.iter().map(|b| b.bin_id.clone()).collect();
        self.locks
            .is_locked(&warehouse_id.to_string(), &all_ids)
            .locked_bins
            .into_iter()
            .collect()
    }

    fn summary(
        &self,
        warehouse_id: &str,
        operation_type: OperationType,
        items: &[LineResult],
        mixed_bins: usize,
    ) -> BatchSummary {
        BatchSummary {
            total: items.len(),
            successful: items
                .iter()
                .filter(|i| i.status == LineStatus::Completed)
                .count(),
            partial: items
                .iter()
                .filter(|i| i.status == LineStatus::Partial)
                .count(),
            failed: items
                .iter()
                .filter(|i| i.status == LineStatus::Failed)
                .count(),
            executed_at: self.clock.now(),
            warehouse_id: warehouse_id.to_string(),
            mixed_bins,
            operation_type,
        }
    }

    /// Put-away batch: each line is planned and executed independently. A
    /// line whose demand cannot be fully satisfied is recorded as failed
    /// and the rest of the batch proceeds (§4.6, Open Question decision —
    /// a partially-allocated line does not commit a partial quantity).
    pub async fn execute_putaway_batch(
        &self,
        warehouse_id: &str,
        items: &[BatchLineItem],
        preferences: AllocationPreferences,
    ) -> EngineResult<BatchResult> {
        // Validate up front so a malformed line never reaches the planner;
        // `slots[i]` stays `None` until the line's final result is known,
        // which keeps output order aligned with `items` regardless of which
        // lines get skipped below.
        let validated: Vec<Result<Sku, EngineError>> =
            items.iter().map(validate_line_item).collect();
        let skus: Vec<Option<Sku>> = validated.iter().map(|r| r.as_ref().ok().cloned()).collect();
        let mut slots: Vec<Option<LineResult>> = items
            .iter()
            .zip(&validated)
            .map(|(item, validated)| match validated {
                Ok(_) => None,
                Err(err) => Some(LineResult::failed(item.barcode.clone(), item.quantity, err.to_string())),
            })
            .collect();

        let bins = self.store.list_bins(&warehouse_id.to_string()).await?;

        let eligible_count = bins.iter().filter(|b| b.is_eligible()).count();
        let total_free: u32 = bins.iter().filter(|b| b.is_eligible()).map(|b| b.free_space()).sum();
        let total_demand: u32 = items
            .iter()
            .zip(&skus)
            .filter(|(_, sku)| sku.is_some())
            .map(|(item, _)| item.quantity)
            .sum();

        if eligible_count == 0 || total_free < total_demand {
            tracing::warn!(
                warehouse_id = %warehouse_id,
                eligible_count,
                total_free,
                total_demand,
                "pre-flight capacity check failed, failing entire put-away batch"
            );
            for (idx, item) in items.iter().enumerate() {
                if skus[idx].is_some() {
                    slots[idx] = Some(LineResult::failed(
                        item.barcode.clone(),
                        item.quantity,
                        format!(
                            "insufficient warehouse capacity: {total_free} free across {eligible_count} bin(s) for {total_demand} requested"
                        ),
                    ));
                }
            }
            let results: Vec<LineResult> = slots.into_iter().map(|r| r.expect("every line resolved")).collect();
            let summary = self.summary(warehouse_id, OperationType::Putaway, &results, 0);
            return Ok(BatchResult {
                items: results,
                summary,
            });
        }

        let locked = self.locked_bin_ids(warehouse_id, &bins);
        let mut mixed_bin_codes: HashSet<String> = HashSet::new();

        for (idx, item) in items.iter().enumerate() {
            let sku = match &skus[idx] {
                Some(sku) => sku.clone(),
                None => continue,
            };
            let fresh_bins = self.store.list_bins(&warehouse_id.to_string()).await?;
            let plan = AllocationPlanner::plan(&fresh_bins, &locked, &sku, item.quantity, &preferences);

            if !plan.is_fully_allocated() {
                tracing::info!(barcode = %item.barcode, remaining = plan.remaining_quantity, "put-away line under-allocated, failing line");
                slots[idx] = Some(LineResult::failed(
                    item.barcode.clone(),
                    item.quantity,
                    format!(
                        "{}; {} unit(s) could not be placed",
                        plan.summary, plan.remaining_quantity
                    ),
                ));
                continue;
            }

            let mut locations = Vec::with_capacity(plan.entries.len());
            let mut line_failed = None;
            for entry in &plan.entries {
                match self
                    .executor
                    .apply_putaway(warehouse_id, &entry.bin_id, &sku, entry.quantity, Default::default())
                    .await
                {
                    Ok(history) => {
                        locations.push(entry.bin_code.clone());
                        if history.was_mixed == Some(true) {
                            mixed_bin_codes.insert(entry.bin_code.clone());
                        }
                    }
                    Err(err) => {
                        line_failed = Some(err.to_string());
                        break;
                    }
                }
            }

            slots[idx] = Some(match line_failed {
                Some(reason) => {
                    tracing::warn!(barcode = %item.barcode, reason = %reason, "put-away line failed mid-execution");
                    LineResult::failed(item.barcode.clone(), item.quantity, reason)
                }
                None => LineResult::completed(item.barcode.clone(), item.quantity, locations),
            });
        }

        let results: Vec<LineResult> = slots.into_iter().map(|r| r.expect("every line resolved")).collect();
        let summary = self.summary(warehouse_id, OperationType::Putaway, &results, mixed_bin_codes.len());
        Ok(BatchResult {
            items: results,
            summary,
        })
    }

    /// Pick batch: all-or-nothing pre-validation, then a locked, re-planned
    /// execution pass per line (§4.6). If any line is short on stock the
    /// whole batch is rejected before anything is locked or mutated.
    pub async fn execute_pick_batch(
        &self,
        warehouse_id: &str,
        items: &[BatchLineItem],
    ) -> EngineResult<BatchResult> {
        let validated: Vec<Result<Sku, EngineError>> =
            items.iter().map(validate_line_item).collect();
        let mut slots: Vec<Option<LineResult>> = items
            .iter()
            .zip(&validated)
            .map(|(item, validated)| match validated {
                Ok(_) => None,
                Err(err) => Some(LineResult::failed(item.barcode.clone(), item.quantity, err.to_string())),
            })
            .collect();

        let reference_date = self.clock.now().date_naive();
        let bins = self.store.list_bins(&warehouse_id.to_string()).await?;

        let preflight: Vec<(usize, &BatchLineItem, crate::models::PickPlan)> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let sku = validated[idx].as_ref().ok()?;
                Some((idx, item, PickPlanner::plan(&bins, sku, item.quantity, reference_date)))
            })
            .collect();

        if preflight.iter().any(|(_, _, plan)| !plan.is_fully_available()) {
            tracing::info!(warehouse_id = %warehouse_id, "pick batch pre-validation found a shortfall, rejecting entire batch");
            for (idx, item, plan) in preflight {
                slots[idx] = Some(if plan.is_fully_available() {
                    LineResult::failed(
                        item.barcode.clone(),
                        item.quantity,
                        "batch cancelled: another line in the same batch was short on stock",
                    )
                } else {
                    LineResult::failed(
                        item.barcode.clone(),
                        item.quantity,
                        EngineError::InsufficientStock {
                            sku: item.sku(),
                            requested: item.quantity,
                            available: plan.total_available,
                        }
                        .to_string(),
                    )
                });
            }
            let results: Vec<LineResult> = slots.into_iter().map(|r| r.expect("every line resolved")).collect();
            let summary = self.summary(warehouse_id, OperationType::Pick, &results, 0);
            return Ok(BatchResult {
                items: results,
                summary,
            });
        }

        let operation_id = self.id_gen.new_id();
        let all_bin_ids: Vec<String> = preflight
            .iter()
            .flat_map(|(_, _, plan)| plan.entries.iter().map(|e| e.bin_id.clone()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let warehouse = warehouse_id.to_string();
        if let Err(err) = self.locks.acquire(&warehouse, &all_bin_ids, &operation_id).await {
            tracing::warn!(warehouse_id = %warehouse_id, operation_id = %operation_id, error = %err, "lock acquisition failed, rejecting entire pick batch");
            for (idx, item) in items.iter().enumerate() {
                if validated[idx].is_ok() {
                    slots[idx] = Some(LineResult::failed(item.barcode.clone(), item.quantity, err.to_string()));
                }
            }
            let results: Vec<LineResult> = slots.into_iter().map(|r| r.expect("every line resolved")).collect();
            let summary = self.summary(warehouse_id, OperationType::Pick, &results, 0);
            return Ok(BatchResult {
                items: results,
                summary,
            });
        }

        let mut mixed_bin_codes: HashSet<String> = HashSet::new();

        for (idx, item) in items.iter().enumerate() {
            let sku = match &validated[idx] {
                Ok(sku) => sku.clone(),
                Err(_) => continue,
            };
            let fresh_bins = match self.store.list_bins(&warehouse).await {
                Ok(bins) => bins,
                Err(err) => {
                    slots[idx] = Some(LineResult::failed(item.barcode.clone(), item.quantity, err.to_string()));
                    continue;
                }
            };
            let plan = PickPlanner::plan(&fresh_bins, &sku, item.quantity, reference_date);

            if plan.total_picked == 0 {
                slots[idx] = Some(LineResult::failed(
                    item.barcode.clone(),
                    item.quantity,
                    "no stock remained available at execution time",
                ));
                continue;
            }

            let mut picked_bins = Vec::with_capacity(plan.entries.len());
            let mut locations = Vec::with_capacity(plan.entries.len());
            let mut executed_qty = 0u32;
            let mut line_error = None;

            for entry in &plan.entries {
                match self
                    .executor
                    .apply_pick(warehouse_id, &entry.bin_id, &sku, entry.quantity, &operation_id)
                    .await
                {
                    Ok(history) => {
                        executed_qty += entry.quantity;
                        locations.push(entry.bin_code.clone());
                        if entry.is_mixed {
                            mixed_bin_codes.insert(entry.bin_code.clone());
                        }
                        picked_bins.push(PickedBin {
                            bin_code: entry.bin_code.clone(),
                            quantity: entry.quantity,
                            fifo_reason: entry.fifo_reason.clone(),
                            is_mixed: history.was_mixed.unwrap_or(entry.is_mixed),
                            pick_order: entry.pick_order,
                        });
                    }
                    Err(err) => {
                        line_error = Some(err.to_string());
                        break;
                    }
                }
            }

            let mut result = if let Some(reason) = line_error {
                let mut r = LineResult::failed(item.barcode.clone(), item.quantity, reason);
                r.locations = locations;
                r.picked_qty = Some(executed_qty);
                r
            } else if executed_qty == item.quantity {
                LineResult::completed(item.barcode.clone(), item.quantity, locations)
            } else {
                LineResult {
                    barcode: item.barcode.clone(),
                    quantity: item.quantity,
                    status: LineStatus::Partial,
                    locations,
                    picked_qty: Some(executed_qty),
                    available_qty: Some(plan.total_available),
                    shortfall: Some(item.quantity - executed_qty),
                    error: None,
                    picked_bins: None,
                }
            };
            result.picked_bins = if picked_bins.is_empty() { None } else { Some(picked_bins) };
            slots[idx] = Some(result);
        }

        self.locks.release(&warehouse, &all_bin_ids, &operation_id).await;

        let results: Vec<LineResult> = slots.into_iter().map(|r| r.expect("every line resolved")).collect();
        let summary = self.summary(warehouse_id, OperationType::Pick, &results, mixed_bin_codes.len());
        Ok(BatchResult {
            items: results,
            summary,
        })
    }
}
