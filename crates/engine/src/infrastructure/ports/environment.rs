//! Time and entropy, injected so naming and expiry are reproducible in tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of "now". Local-zone formatting is done by the caller.
#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Short ids and level seeds.
pub trait RandomPort: Send + Sync {
    /// v4 UUID; its first eight hex digits become `%id%`.
    fn gen_uuid(&self) -> Uuid;
    fn gen_seed(&self) -> i64;
}
