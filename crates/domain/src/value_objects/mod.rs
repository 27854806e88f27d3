//! Value objects - Immutable objects defined by their attributes

mod names;
pub mod settings;
mod time_pattern;

pub use names::{
    render, short_id, strip_time_suffixes, BaseName, InstanceName, NameTokens,
    DEFAULT_LEVEL_NAME,
};
pub use settings::{RetirePolicy, RotationSettings, SeedMode, SeedPolicy};
pub use time_pattern::{TimePattern, BACKUP_TIMESTAMP_PATTERN, DEFAULT_TIME_PATTERN};
