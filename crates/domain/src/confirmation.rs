use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A destructive action waiting for the actor's confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    /// Kill every occupant, then rotate. Hardcore worlds only.
    TerminateAndRotate,
    /// Rotate without touching occupants.
    Rotate,
}

impl PendingAction {
    pub fn describe(&self) -> &'static str {
        match self {
            PendingAction::TerminateAndRotate => "terminate all occupants and rotate the world",
            PendingAction::Rotate => "rotate the world",
        }
    }
}

/// A pending confirmation for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub action: PendingAction,
    pub expires_at: DateTime<Utc>,
}

impl PendingConfirmation {
    /// Live up to and including the expiry instant.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now
    }
}
