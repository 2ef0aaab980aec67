pub mod batch;
pub mod bin;
pub mod history;
pub mod lock;
pub mod plan;
pub mod sku;

pub use batch::{
    BatchLineItem, BatchResult, BatchSummary, LineResult, LineStatus, OperationType, PickedBin,
};
pub use bin::{Bin, BinContent, BinId, BinStatus, PutawayClassification, SkuRecord, WarehouseId};
pub use history::{HistoryEntry, HistoryFilter, HistoryKind};
pub use lock::{LockStatus, PickLock};
pub use plan::{
    AllocationPlan, AllocationPlanEntry, AllocationPreferences, PickPlan, PickPlanEntry,
};
pub use sku::Sku;
