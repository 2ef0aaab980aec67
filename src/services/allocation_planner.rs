use std::collections::HashSet;

use crate::models::{AllocationPlan, AllocationPlanEntry, AllocationPreferences, Bin, Sku};

/// Produces an ordered plan for placing `(sku, quantity)` into bins, under
/// the two-tier policy of §4.3: same-SKU consolidation first, then open
/// space (empty or mixed-capable) bins, both visited in bin-code
/// lexicographic order. Pure over a snapshot — no I/O, no mutation, no
/// retries; callers re-invoke it with a fresh snapshot if they need an
/// up-to-date plan.
pub struct AllocationPlanner;

impl AllocationPlanner {
    /// `locked_bin_ids` are bins currently held by a pick operation; they
    /// are excluded from both tiers so a put-away never races a live pick.
    pub fn plan(
        bins: &[Bin],
        locked_bin_ids: &HashSet<String>,
        sku: &Sku,
        total_quantity: u32,
        _preferences: &AllocationPreferences,
    ) -> AllocationPlan {
        let mut remaining = total_quantity;
        let mut entries = Vec::new();

        let eligible: Vec<&Bin> = bins
            .iter()
            .filter(|b| b.is_eligible() && !locked_bin_ids.contains(&b.bin_id))
            .collect();

        // Tier 1: same-SKU consolidation, bin-code lexicographic order.
        let mut tier1: Vec<&&Bin> = eligible
            .iter()
            .filter(|b| b.contains_sku(sku) && b.free_space() > 0)
            .collect();
        tier1.sort_by(|a, b| a.code.cmp(&b.code));

        for bin in tier1 {
            if remaining == 0 {
                break;
            }
            let add_qty = remaining.min(bin.free_space());
            if add_qty == 0 {
                continue;
            }
            let new_total = bin.current_qty() + add_qty;
            entries.push(AllocationPlanEntry {
                bin_id: bin.bin_id.clone(),
                bin_code: bin.code.clone(),
                quantity: add_qty,
                reason: format!(
                    "Same-SKU consolidation: bin {} already holds {}",
                    bin.code, sku
                ),
                priority_tier: 1,
                new_total,
                utilization_after: new_total as f64 / bin.capacity as f64,
            });
            remaining -= add_qty;
        }

        // Tier 2: open space, bin-code lexicographic order. Re-derive free
        // space from the tier-1 entries already planned against the same
        // bin (a bin can appear in both tiers only if remaining hit zero
        // mid-tier-1, in which case this loop never runs).
        if remaining > 0 {
            let mut tier2: Vec<&&Bin> = eligible.iter().filter(|b| b.free_space() > 0).collect();
            tier2.sort_by(|a, b| a.code.cmp(&b.code));

            for bin in tier2 {
                if remaining == 0 {
                    break;
                }
                let already_planned: u32 = entries
                    .iter()
                    .filter(|e| e.bin_id == bin.bin_id)
                    .map(|e| e.quantity)
                    .sum();
                let free_now = bin.free_space().saturating_sub(already_planned);
                if free_now == 0 {
                    continue;
                }
                let add_qty = remaining.min(free_now);
                let new_total = bin.current_qty() + already_planned + add_qty;
                let reason = if bin.content.is_empty() {
                    format!("Open space: empty bin {}", bin.code)
                } else {
                    format!(
                        "Open space: mixed storage alongside existing contents of bin {}",
                        bin.code
                    )
                };
                entries.push(AllocationPlanEntry {
                    bin_id: bin.bin_id.clone(),
                    bin_code: bin.code.clone(),
                    quantity: add_qty,
                    reason,
                    priority_tier: 2,
                    new_total,
                    utilization_after: new_total as f64 / bin.capacity as f64,
                });
                remaining -= add_qty;
            }
        }

        let total_allocated = total_quantity - remaining;
        let summary = if remaining == 0 {
            format!(
                "Allocated {} of {} for {} across {} bin(s)",
                total_allocated,
                total_quantity,
                sku,
                entries.len()
            )
        } else {
            format!(
                "Allocated {} of {} for {}; {} unallocated — no bin creation, allocation never creates bins",
                total_allocated, total_quantity, sku, remaining
            )
        };

        AllocationPlan {
            sku: sku.clone(),
            entries,
            total_allocated,
            remaining_quantity: remaining,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BinContent, SkuRecord};
    use chrono::Utc;

    fn bin(code: &str, capacity: u32, content: BinContent) -> Bin {
        let mut b = Bin::new_empty(
            format!("bin-{code}"),
            code,
            "WH1",
            "R1",
            1,
            1,
            capacity,
            Utc::now(),
        );
        b.content = content;
        b.refresh_status();
        b
    }

    #[test]
    fn s5_tiering_fills_same_sku_bin_before_empty_bin() {
        let sku001 = Sku::new("SKU001");
        let b1 = bin(
            "B1",
            10,
            BinContent::Pure(SkuRecord::new(sku001.clone(), 3)),
        );
        let b2 = bin("B2", 10, BinContent::Empty);
        let bins = vec![b1, b2];

        let plan = AllocationPlanner::plan(
            &bins,
            &HashSet::new(),
            &sku001,
            5,
            &AllocationPreferences::default(),
        );

        assert!(plan.is_fully_allocated());
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].bin_code, "B1");
        assert_eq!(plan.entries[0].quantity, 5);
        assert_eq!(plan.entries[0].priority_tier, 1);
    }

    #[test]
    fn s6_tier1_overflow_spills_into_tier2_lexicographic_order() {
        let sku001 = Sku::new("SKU001");
        let sku002 = Sku::new("SKU002");
        let b1 = bin(
            "B1",
            10,
            BinContent::Pure(SkuRecord::new(sku001.clone(), 9)),
        );
        let b2 = bin(
            "B2",
            10,
            BinContent::Pure(SkuRecord::new(sku002.clone(), 8)),
        );
        let b3 = bin("B3", 10, BinContent::Empty);
        let bins = vec![b1, b2, b3];

        let plan = AllocationPlanner::plan(
            &bins,
            &HashSet::new(),
            &sku001,
            5,
            &AllocationPreferences::default(),
        );

        assert!(plan.is_fully_allocated());
        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.entries[0].bin_code, "B1");
        assert_eq!(plan.entries[0].quantity, 1);
        assert_eq!(plan.entries[0].priority_tier, 1);
        assert_eq!(plan.entries[1].bin_code, "B2");
        assert_eq!(plan.entries[1].quantity, 4);
        assert_eq!(plan.entries[1].priority_tier, 2);
        assert_eq!(plan.entries[2].bin_code, "B3");
        assert_eq!(plan.entries[2].quantity, 2);
        assert_eq!(plan.entries[2].priority_tier, 2);
    }

    #[test]
    fn locked_bins_are_excluded_from_both_tiers() {
        let sku001 = Sku::new("SKU001");
        let b1 = bin(
            "B1",
            10,
            BinContent::Pure(SkuRecord::new(sku001.clone(), 3)),
        );
        let bins = vec![b1.clone()];
        let mut locked = HashSet::new();
        locked.insert(b1.bin_id.clone());

        let plan = AllocationPlanner::plan(
            &bins,
            &locked,
            &sku001,
            5,
            &AllocationPreferences::default(),
        );

        assert!(!plan.is_fully_allocated());
        assert_eq!(plan.remaining_quantity, 5);
        assert!(plan.entries.is_empty());
    }

    #[test]
    fn never_creates_bins_when_capacity_is_short() {
        let sku001 = Sku::new("SKU001");
        let b1 = bin("B1", 3, BinContent::Empty);
        let bins = vec![b1];

        let plan = AllocationPlanner::plan(
            &bins,
            &HashSet::new(),
            &sku001,
            5,
            &AllocationPreferences::default(),
        );

        assert_eq!(plan.total_allocated, 3);
        assert_eq!(plan.remaining_quantity, 2);
    }

    #[test]
    fn planner_determinism_identical_snapshot_yields_identical_plan() {
        let sku001 = Sku::new("SKU001");
        let b1 = bin(
            "B1",
            10,
            BinContent::Pure(SkuRecord::new(sku001.clone(), 3)),
        );
        let b2 = bin("B2", 10, BinContent::Empty);
        let bins = vec![b1, b2];

        let plan_a = AllocationPlanner::plan(
            &bins,
            &HashSet::new(),
            &sku001,
            5,
            &AllocationPreferences::default(),
        );
        let plan_b = AllocationPlanner::plan(
            &bins,
            &HashSet::new(),
            &sku001,
            5,
            &AllocationPreferences::default(),
        );

        assert_eq!(plan_a.total_allocated, plan_b.total_allocated);
        assert_eq!(plan_a.entries.len(), plan_b.entries.len());
        for (a, b) in plan_a.entries.iter().zip(plan_b.entries.iter()) {
            assert_eq!(a.bin_code, b.bin_code);
            assert_eq!(a.quantity, b.quantity);
        }
    }
}
