//! Domain types for world-instance rotation.
//!
//! Pure value objects and records with no I/O: naming rules, timestamp
//! patterns, settings resolution, rotation markers and notices.

pub mod confirmation;
pub mod error;
pub mod ids;
pub mod rotation;
pub mod value_objects;
pub mod world_time;

pub use confirmation::{PendingAction, PendingConfirmation};
pub use error::DomainError;
pub use ids::ActorId;
pub use rotation::{RotationMarker, RotationNotice, RotationTrigger, UNKNOWN_OCCUPANT};
pub use value_objects::{
    render, short_id, strip_time_suffixes, BaseName, InstanceName, NameTokens, RetirePolicy,
    RotationSettings, SeedMode, SeedPolicy, TimePattern, DEFAULT_LEVEL_NAME,
};
pub use world_time::{format_uptime, WorldStartRecord};
