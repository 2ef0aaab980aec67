use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::bin::PutawayClassification;
use crate::models::Sku;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    Putaway,
    Pick,
}

impl HistoryKind {
    pub fn as_operation_type(&self) -> &'static str {
        match self {
            HistoryKind::Putaway => "putaway",
            HistoryKind::Pick => "pick",
        }
    }
}

/// Append-only audit record of one committed bin mutation. Immutable except
/// for the `rolled_back` flag, which `RollbackEngine` sets once it has
/// applied the inverse operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: String,
    pub kind: HistoryKind,
    pub timestamp: DateTime<Utc>,
    pub warehouse_id: String,
    pub sku: Sku,
    pub quantity: u32,
    pub bin_id: String,
    pub bin_code: String,
    pub previous_qty: u32,
    pub new_qty: u32,
    pub allocation_type: Option<PutawayClassification>,
    pub fifo_reason: Option<String>,
    pub was_mixed: Option<bool>,
    pub operation_id: String,
    pub rolled_back: bool,
}

/// Filter for [`crate::store::HistoryStore::query_history`].
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub warehouse_id: Option<String>,
    pub sku: Option<Sku>,
    pub bin_id: Option<String>,
    pub kind: Option<HistoryKind>,
    pub operation_id: Option<String>,
    pub include_rolled_back: bool,
}
