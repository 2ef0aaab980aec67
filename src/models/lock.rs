use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Advisory, time-bounded, per-bin exclusion held by an operation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickLock {
    pub operation_id: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of [`crate::services::LockManager::is_locked`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockStatus {
    pub locked: bool,
    pub locked_bins: Vec<String>,
    pub owner: Option<String>,
    /// The held lock for each bin in `locked_bins`, same order, for callers
    /// that need the owning operation id or expiry rather than just the
    /// bin id (e.g. surfacing "held by op X until Y" to an operator).
    pub locks: Vec<PickLock>,
}
