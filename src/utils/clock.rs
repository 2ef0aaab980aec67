use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Injected time source for the lock manager and for anything that stamps
/// `acquiredAt`/`createdAt` fields. Production code uses [`SystemClock`];
/// tests use [`TestClock`] to advance time deterministically instead of
/// sleeping real wall-clock seconds to exercise the 10-minute TTL.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually-advanced clock for tests.
pub struct TestClock {
    current: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut current = self.current.lock().expect("test clock poisoned");
        *current += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut current = self.current.lock().expect("test clock poisoned");
        *current = at;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().expect("test clock poisoned")
    }
}
