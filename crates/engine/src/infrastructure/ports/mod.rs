//! Boundaries of the engine.
//!
//! Everything outside the process (the game server and its occupants) and
//! everything nondeterministic (time, randomness) is reached through these
//! traits. Filesystem access is concrete and lives in `server_files`.

mod environment;
mod error;
mod host;

pub use environment::{ClockPort, RandomPort};
pub use error::{HostError, StoreError};
pub use host::{HostPort, HostTask, OccupantPort};

#[cfg(test)]
pub use environment::MockClockPort;
#[cfg(test)]
pub use host::MockOccupantPort;
