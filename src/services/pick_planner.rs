use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::models::{Bin, BinStatus, PickPlan, PickPlanEntry, Sku};

/// Produces a FIFO pick plan for `(sku, required_quantity)`, including
/// mixed bins. Pure over a snapshot — no I/O, no mutation. Must be
/// re-invoked with a fresh snapshot immediately before execution (§4.6
/// step 3) since earlier picks in the same batch may have emptied shared
/// bins.
pub struct PickPlanner;

/// A bin's rank in FIFO order for a specific SKU. Comparison proceeds to
/// the next field only on tie, per §4.4:
/// expiry (earliest, with-expiry before without) → lot date → created_at
/// → grid level → position → bin code.
struct FifoKey<'a> {
    expiry_date: Option<NaiveDate>,
    lot_date: Option<NaiveDate>,
    created_at: chrono::DateTime<chrono::Utc>,
    grid_level: u32,
    position: u32,
    bin_code: &'a str,
}

fn cmp_option_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl<'a> FifoKey<'a> {
    fn cmp(&self, other: &FifoKey<'a>) -> Ordering {
        cmp_option_date(self.expiry_date, other.expiry_date)
            .then_with(|| cmp_option_date(self.lot_date, other.lot_date))
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.grid_level.cmp(&other.grid_level))
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.bin_code.cmp(other.bin_code))
    }
}

fn fifo_reason(
    bin: &Bin,
    record_expiry: Option<NaiveDate>,
    record_lot_date: Option<NaiveDate>,
    reference_date: NaiveDate,
) -> String {
    let mut parts = Vec::new();
    if let Some(expiry) = record_expiry {
        let age_days = (reference_date - bin.created_at.date_naive()).num_days();
        parts.push(format!("earliest expiry {expiry} ({age_days}d in stock)"));
    } else if let Some(lot_date) = record_lot_date {
        parts.push(format!("no expiry, earliest lot date {lot_date}"));
    } else {
        let age_days = (reference_date - bin.created_at.date_naive()).num_days();
        parts.push(format!("no expiry or lot date, oldest receipt ({age_days}d)"));
    }
    parts.push(format!("grid level {}", bin.grid_level));
    if bin.is_mixed() {
        parts.push("mixed bin".to_string());
    }
    parts.join(", ")
}

impl PickPlanner {
    /// `reference_date` anchors the "Nd in stock" age phrasing in
    /// `fifo_reason`; the caller supplies it (normally `Clock::now()`'s
    /// date) so the plan stays a pure function of `(bins, sku, quantity,
    /// reference_date)` rather than reading the wall clock mid-computation
    /// (§9 "planner as pure function", §8 determinism law).
    pub fn plan(bins: &[Bin], sku: &Sku, required_quantity: u32, reference_date: NaiveDate) -> PickPlan {
        let mut candidates: Vec<&Bin> = bins
            .iter()
            .filter(|b| matches!(b.status, BinStatus::Occupied) && b.contains_sku(sku))
            .collect();

        candidates.sort_by(|a, b| {
            let ra = a.content.record_for(sku);
            let rb = b.content.record_for(sku);
            let key_a = FifoKey {
                expiry_date: ra.and_then(|r| r.expiry_date),
                lot_date: ra.and_then(|r| r.lot_date),
                created_at: a.created_at,
                grid_level: a.grid_level,
                position: a.position,
                bin_code: &a.code,
            };
            let key_b = FifoKey {
                expiry_date: rb.and_then(|r| r.expiry_date),
                lot_date: rb.and_then(|r| r.lot_date),
                created_at: b.created_at,
                grid_level: b.grid_level,
                position: b.position,
                bin_code: &b.code,
            };
            key_a.cmp(&key_b)
        });

        let total_available: u32 = candidates.iter().map(|b| b.quantity_of(sku)).sum();

        let mut remaining = required_quantity;
        let mut entries = Vec::new();
        for (order, bin) in candidates.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let available = bin.quantity_of(sku);
            if available == 0 {
                continue;
            }
            let draw = remaining.min(available);
            let record = bin.content.record_for(sku);
            entries.push(PickPlanEntry {
                bin_id: bin.bin_id.clone(),
                bin_code: bin.code.clone(),
                quantity: draw,
                fifo_reason: fifo_reason(
                    bin,
                    record.and_then(|r| r.expiry_date),
                    record.and_then(|r| r.lot_date),
                    reference_date,
                ),
                is_mixed: bin.is_mixed(),
                pick_order: order,
            });
            remaining -= draw;
        }

        let total_picked = required_quantity - remaining;
        let shortfall = remaining;

        PickPlan {
            sku: sku.clone(),
            entries,
            total_available,
            total_picked,
            shortfall,
        }
    }
}
