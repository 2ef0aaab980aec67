//! Warehouse bin allocation and FIFO picking core.
//!
//! This crate is a library: it has no HTTP surface, no database driver, and
//! no `main.rs`. An embedding service wires it to its own transport and
//! persistence layer by implementing [`store::BinStore`] and
//! [`store::HistoryStore`] (or using the shipped in-memory reference
//! implementations) and driving [`services::BatchCoordinator`] /
//! [`services::RollbackEngine`] directly.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ErrorCode, ErrorSeverity};

use std::sync::Arc;

use services::{BatchCoordinator, Executor, LockManager, RollbackEngine};
use store::{BinStore, HistoryStore, InMemoryBinStore, InMemoryHistoryStore};
use utils::{Clock, IdGen, SystemClock, UuidIdGen};

/// Bundles the wired-together components an embedding caller needs: the
/// planners are stateless and exposed as associated functions, while the
/// stateful pieces (store, history, locks, executor, coordinator, rollback)
/// are constructed once and shared. Analogous to the source's `main.rs`
/// wiring step, minus the HTTP router and DB pool.
pub struct Engine {
    pub store: Arc<dyn BinStore>,
    pub history: Arc<dyn HistoryStore>,
    pub locks: Arc<LockManager>,
    pub batches: BatchCoordinator,
    pub rollback: RollbackEngine,
    pub config: EngineConfig,
}

impl Engine {
    /// Wires up the crate's own in-memory `BinStore`/`HistoryStore`, a real
    /// `UuidIdGen`, and a real `SystemClock`. Suitable for single-process
    /// embedding and for tests that don't need a custom backend.
    pub fn new_in_memory(config: EngineConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let id_gen: Arc<dyn IdGen> = Arc::new(UuidIdGen);
        let locks = Arc::new(LockManager::with_clock(config.lock_ttl_secs, clock.clone()));
        let store: Arc<dyn BinStore> = Arc::new(InMemoryBinStore::new(locks.clone()));
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::new());
        Self::new(store, history, locks, clock, id_gen, config)
    }

    /// Wires up arbitrary `BinStore`/`HistoryStore` implementations —
    /// used when an embedding caller has its own persistence backend.
    pub fn new(
        store: Arc<dyn BinStore>,
        history: Arc<dyn HistoryStore>,
        locks: Arc<LockManager>,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        config: EngineConfig,
    ) -> Self {
        let executor = Executor::new(store.clone(), history.clone(), clock.clone(), id_gen.clone());
        let rollback_executor = Executor::new(store.clone(), history.clone(), clock.clone(), id_gen.clone());
        let batches = BatchCoordinator::new(store.clone(), locks.clone(), executor, clock, id_gen);
        let rollback = RollbackEngine::new(store.clone(), history.clone(), locks.clone(), rollback_executor);

        Self {
            store,
            history,
            locks,
            batches,
            rollback,
            config,
        }
    }

    /// Spawns the lock manager's background expiry sweep on the current
    /// Tokio runtime, per §4.2's timing model.
    pub fn spawn_lock_sweeper(&self) -> tokio::task::JoinHandle<()> {
        services::spawn_sweeper(self.locks.clone(), self.config.lock_sweep_interval_secs)
    }
}
