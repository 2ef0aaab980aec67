use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Injected identifier source for operation ids and history entry ids.
/// Production code uses [`UuidIdGen`]; tests use [`SequentialIdGen`] so
/// assertions can reference exact ids instead of pattern-matching UUIDs.
pub trait IdGen: Send + Sync {
    fn new_id(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic id generator for tests: `prefix-1`, `prefix-2`, ...
pub struct SequentialIdGen {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGen for SequentialIdGen {
    fn new_id(&self) -> String {
        let next = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, next)
    }
}
