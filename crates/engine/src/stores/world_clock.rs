//! Start time of the loaded world instance.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use worldcycle_domain::WorldStartRecord;

#[derive(Debug, Default)]
pub struct WorldClock {
    record: RwLock<Option<WorldStartRecord>>,
}

impl WorldClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, record: WorldStartRecord) {
        *self
            .record
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(record);
    }

    pub fn get(&self) -> Option<WorldStartRecord> {
        self.record
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Zero until a start has been recorded.
    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        self.get()
            .map(|record| record.uptime(now))
            .unwrap_or_else(Duration::zero)
    }
}
