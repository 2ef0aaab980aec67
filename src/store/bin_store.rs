use async_trait::async_trait;

use crate::error::EngineResult;
use crate::models::{Bin, WarehouseId};

/// Per-bin CRUD with optimistic-version update. External collaborators
/// (spreadsheet upload, warehouse setup, the persistence backend itself)
/// are outside this crate's scope — this trait is the seam a caller wires
/// a concrete backend behind, the way the source wires a SQL Server pool
/// behind its service layer.
///
/// `get_bin`/`list_bins`/`update_bin` are the only I/O boundaries the
/// planners and executor cross; everything else in this crate is pure.
#[async_trait]
pub trait BinStore: Send + Sync {
    async fn get_bin(&self, bin_id: &str) -> EngineResult<Bin>;

    /// Returns a coherent snapshot of every bin in the warehouse. Planners
    /// treat the result as immutable for the duration of one planning call.
    async fn list_bins(&self, warehouse_id: &WarehouseId) -> EngineResult<Vec<Bin>>;

    /// Commits `new_state` iff the bin currently on record has version
    /// `expected_version`. If the bin is pick-locked and
    /// `owner_operation_id` does not own the lock, fails with
    /// `LockViolation` instead of committing. On success the returned
    /// `Bin` carries the incremented version.
    async fn update_bin(
        &self,
        bin_id: &str,
        new_state: Bin,
        expected_version: u64,
        owner_operation_id: Option<&str>,
    ) -> EngineResult<Bin>;
}
