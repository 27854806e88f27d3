use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies whoever issued a destructive command (an occupant or the console).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(Uuid);

impl ActorId {
    /// The server console. All console sessions share one confirmation slot.
    pub const fn console() -> Self {
        Self(Uuid::nil())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn is_console(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_console() {
            write!(f, "console")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<Uuid> for ActorId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}
