use async_trait::async_trait;

use crate::error::EngineResult;
use crate::models::{HistoryEntry, HistoryFilter};

/// Append-only audit log capability. History entries are immutable except
/// for the `rolled_back` flag `RollbackEngine` sets after applying an
/// inverse operation.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_history(&self, entry: HistoryEntry) -> EngineResult<()>;

    async fn get_history_entry(&self, entry_id: &str) -> EngineResult<HistoryEntry>;

    async fn query_history(&self, filter: HistoryFilter) -> EngineResult<Vec<HistoryEntry>>;

    async fn mark_rolled_back(&self, entry_id: &str) -> EngineResult<()>;
}
