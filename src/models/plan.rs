use serde::{Deserialize, Serialize};

use crate::models::Sku;

/// One tier-1 (same-SKU consolidation) or tier-2 (open space) placement
/// decision produced by [`crate::services::AllocationPlanner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlanEntry {
    pub bin_id: String,
    pub bin_code: String,
    pub quantity: u32,
    pub reason: String,
    pub priority_tier: u8,
    pub new_total: u32,
    pub utilization_after: f64,
}

/// Output of [`crate::services::AllocationPlanner::plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub sku: Sku,
    pub entries: Vec<AllocationPlanEntry>,
    pub total_allocated: u32,
    pub remaining_quantity: u32,
    pub summary: String,
}

impl AllocationPlan {
    pub fn is_fully_allocated(&self) -> bool {
        self.remaining_quantity == 0
    }
}

/// Preferences threaded through to [`AllocationPlan`] reasons; the tiering
/// itself (§4.3) is not affected by these beyond the default
/// `prefer_existing_sku` assumption baked into tier ordering.
#[derive(Debug, Clone)]
pub struct AllocationPreferences {
    pub zone_id: Option<String>,
    pub prefer_ground_level: bool,
    pub prefer_existing_sku: bool,
}

impl Default for AllocationPreferences {
    fn default() -> Self {
        Self {
            zone_id: None,
            prefer_ground_level: true,
            prefer_existing_sku: true,
        }
    }
}

/// One bin's contribution to a FIFO pick plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickPlanEntry {
    pub bin_id: String,
    pub bin_code: String,
    pub quantity: u32,
    pub fifo_reason: String,
    pub is_mixed: bool,
    pub pick_order: usize,
}

/// Output of [`crate::services::PickPlanner::plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickPlan {
    pub sku: Sku,
    pub entries: Vec<PickPlanEntry>,
    pub total_available: u32,
    pub total_picked: u32,
    pub shortfall: u32,
}

impl PickPlan {
    pub fn is_fully_available(&self) -> bool {
        self.shortfall == 0
    }
}
