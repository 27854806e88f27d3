//! Host process ports.
//!
//! The orchestrator never sees the game server directly. Everything it needs
//! (occupants, broadcasts, the main-thread executor and the stop switch) is
//! reached through these traits.

use std::sync::Arc;

use worldcycle_domain::RotationNotice;

use super::error::HostError;

/// Work to run on the host's own execution context.
pub type HostTask = Box<dyn FnOnce() + Send + 'static>;

/// One occupant (player) of the world instance.
#[cfg_attr(test, mockall::automock)]
pub trait OccupantPort: Send + Sync {
    fn name(&self) -> String;
    fn is_alive(&self) -> bool;
    /// The host's regular kill primitive.
    fn mark_dead(&self) -> Result<(), HostError>;
    /// Last resort when `mark_dead` fails: drop vitality to zero.
    fn force_zero_vitality(&self) -> Result<(), HostError>;
}

/// The game-server process owning the world instance.
pub trait HostPort: Send + Sync {
    /// Rotation is only supported on dedicated servers.
    fn is_dedicated(&self) -> bool;
    /// Whether the loaded world runs in hardcore mode.
    fn is_hardcore(&self) -> bool;
    fn occupants(&self) -> Vec<Arc<dyn OccupantPort>>;
    fn broadcast(&self, notice: &RotationNotice) -> Result<(), HostError>;
    /// Queue `task` on the host's execution context.
    fn submit(&self, task: HostTask) -> Result<(), HostError>;
    /// Stop the host cleanly. Called from a submitted task, or inline when
    /// the host rejects that task.
    fn stop(&self) -> Result<(), HostError>;
}
