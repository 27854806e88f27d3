//! Wall clock and entropy for production wiring, fixed doubles for tests.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::infrastructure::ports::{ClockPort, RandomPort};

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub const fn new() -> Self {
        Self
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Thread-local RNG for seeds, v4 UUIDs for short ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl SystemRandom {
    pub const fn new() -> Self {
        Self
    }
}

impl RandomPort for SystemRandom {
    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Any `i64`, negative values included, like the host's own seeds.
    fn gen_seed(&self) -> i64 {
        rand::thread_rng().gen()
    }
}

#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns the same id and seed on every call.
#[cfg(test)]
pub struct FixedRandom {
    pub uuid: Uuid,
    pub seed: i64,
}

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn gen_uuid(&self) -> Uuid {
        self.uuid
    }

    fn gen_seed(&self) -> i64 {
        self.seed
    }
}
