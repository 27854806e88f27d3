use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ActorId;
use crate::value_objects::{BaseName, InstanceName};
use crate::world_time::format_uptime;

/// Name used in notices when the dying occupant is unknown.
pub const UNKNOWN_OCCUPANT: &str = "A player";

// =============================================================================
// Trigger
// =============================================================================

/// What caused a rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RotationTrigger {
    /// An occupant died in a hardcore world.
    OccupantDeath { occupant: Option<String> },
    /// An operator confirmed a rotation command.
    Command { actor: ActorId },
}

impl RotationTrigger {
    pub fn death(occupant: impl Into<String>) -> Self {
        let occupant = occupant.into();
        let trimmed = occupant.trim();
        RotationTrigger::OccupantDeath {
            occupant: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    pub fn command(actor: ActorId) -> Self {
        RotationTrigger::Command { actor }
    }

    /// Value recorded as `requestedBy` in the rotation marker.
    pub fn tag(&self) -> &'static str {
        match self {
            RotationTrigger::OccupantDeath { .. } => "DEATH",
            RotationTrigger::Command { .. } => "COMMAND",
        }
    }
}

// =============================================================================
// Marker
// =============================================================================

/// Durable record of a planned rotation, consumed once on the next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationMarker {
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    /// Instance being retired. Kept as raw text since it comes from the host config.
    pub old_level_name: String,
    pub new_level_name: InstanceName,
    pub base_level_name: BaseName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_seed: Option<String>,
}

impl RotationMarker {
    /// The retired instance name, if the marker carries a usable one.
    pub fn retired_level_name(&self) -> Option<&str> {
        let name = self.old_level_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

// =============================================================================
// Notice
// =============================================================================

/// The single broadcast sent to occupants before the host stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationNotice {
    pub trigger: RotationTrigger,
    pub world_uptime: Duration,
    pub restart_delay_seconds: u64,
}

impl fmt::Display for RotationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.trigger {
            RotationTrigger::OccupantDeath { occupant } => write!(
                f,
                "{} has died.",
                occupant.as_deref().unwrap_or(UNKNOWN_OCCUPANT)
            )?,
            RotationTrigger::Command { .. } => write!(f, "Restart Triggered.")?,
        }
        write!(
            f,
            " World lasted {}. Restart in {} seconds.",
            format_uptime(self.world_uptime),
            self.restart_delay_seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_trigger_trims_and_drops_blank_names() {
        assert_eq!(
            RotationTrigger::death("  Steve "),
            RotationTrigger::OccupantDeath {
                occupant: Some("Steve".to_string())
            }
        );
        assert_eq!(
            RotationTrigger::death("   "),
            RotationTrigger::OccupantDeath { occupant: None }
        );
    }

    #[test]
    fn death_notice_names_occupant() {
        let notice = RotationNotice {
            trigger: RotationTrigger::death("Steve"),
            world_uptime: Duration::seconds(3 * 3600 + 25 * 60 + 7),
            restart_delay_seconds: 5,
        };
        assert_eq!(
            notice.to_string(),
            "Steve has died. World lasted 03:25:07. Restart in 5 seconds."
        );
    }

    #[test]
    fn death_notice_without_name_uses_placeholder() {
        let notice = RotationNotice {
            trigger: RotationTrigger::death(""),
            world_uptime: Duration::zero(),
            restart_delay_seconds: 10,
        };
        assert_eq!(
            notice.to_string(),
            "A player has died. World lasted 00:00:00. Restart in 10 seconds."
        );
    }

    #[test]
    fn command_notice_wording() {
        let notice = RotationNotice {
            trigger: RotationTrigger::command(ActorId::console()),
            world_uptime: Duration::seconds(61),
            restart_delay_seconds: 5,
        };
        assert_eq!(
            notice.to_string(),
            "Restart Triggered. World lasted 00:01:01. Restart in 5 seconds."
        );
    }

    #[test]
    fn blank_old_name_is_not_retirable() {
        let marker = RotationMarker {
            requested_by: "COMMAND".to_string(),
            requested_at: Utc::now(),
            old_level_name: "  ".to_string(),
            new_level_name: InstanceName::new("world_x").expect("valid"),
            base_level_name: BaseName::normalize("world"),
            new_seed: None,
        };
        assert_eq!(marker.retired_level_name(), None);
    }
}
