use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Wall-clock source for every timestamp the engine records. Swappable so
/// tests can pin or step time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Public so integration tests can
/// drive enrollment/note timestamps deterministically.
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.current.write() = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.current.write();
        *current = *current + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read()
    }
}
