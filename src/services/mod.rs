pub mod allocation_planner;
pub mod batch_coordinator;
pub mod executor;
pub mod lock_manager;
pub mod pick_planner;
pub mod rollback_engine;

pub use allocation_planner::AllocationPlanner;
pub use batch_coordinator::BatchCoordinator;
pub use executor::{Executor, LotInfo};
pub use lock_manager::{spawn_sweeper, LockManager};
pub use pick_planner::PickPlanner;
pub use rollback_engine::RollbackEngine;
