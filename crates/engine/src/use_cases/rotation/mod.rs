//! World-instance rotation.
//!
//! A rotation happens in two phases around a host restart:
//! - [`PlanRotation`] runs while the host is up. It picks the successor name
//!   and seed, rewrites the host config, writes the marker and schedules a stop.
//! - [`ApplyRotation`] runs on the next start, before the world loads. It
//!   retires the old instance directory and consumes the marker.
//!
//! [`PreviewRotation`] computes what the next plan would produce without
//! writing anything.

mod apply;
mod plan;
mod preview;

pub use apply::{ApplyOutcome, ApplyRotation, ApplyRotationError, RetiredDisposition};
pub use plan::{PlanRotation, PlanRotationError, PlannedRotation};
pub use preview::{PreviewRotation, RotationPreview};

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use worldcycle_domain::{
    render, short_id, BaseName, InstanceName, NameTokens, RotationSettings, SeedPolicy,
};

use crate::infrastructure::ports::RandomPort;
use crate::infrastructure::server_files::ServerFiles;

/// Why a rotation request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    NotDedicated,
    NotHardcore,
    /// Occupants are being terminated right now.
    Processing,
    /// A marker from an earlier request has not been consumed yet.
    RotationPending,
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RefusalReason::NotDedicated => "World rotation is only supported on dedicated servers.",
            RefusalReason::NotHardcore => "This world is not in hardcore mode.",
            RefusalReason::Processing => "A reset is already being processed.",
            RefusalReason::RotationPending => {
                "A world rotation is already pending. Restart the server to apply it."
            }
        };
        f.write_str(text)
    }
}

/// Result of a rotation request, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Planned(PlannedRotation),
    Refused(RefusalReason),
    /// The plan failed; nothing is pending.
    Failed(String),
}

impl RotationOutcome {
    pub fn is_planned(&self) -> bool {
        matches!(self, RotationOutcome::Planned(_))
    }
}

// =============================================================================
// Shared planning helpers
// =============================================================================

/// Seed decision for the next instance, before it is applied to the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SeedDraft {
    Unchanged,
    Random(i64),
    /// `custom` mode with an empty `custom_seed`.
    RandomForBlankCustom(i64),
    Custom(String),
}

impl SeedDraft {
    pub(crate) fn draw(policy: SeedPolicy, random: &dyn RandomPort) -> Self {
        match policy {
            SeedPolicy::Unchanged => SeedDraft::Unchanged,
            SeedPolicy::Random {
                blank_custom: false,
            } => SeedDraft::Random(random.gen_seed()),
            SeedPolicy::Random { blank_custom: true } => {
                SeedDraft::RandomForBlankCustom(random.gen_seed())
            }
            SeedPolicy::Custom(seed) => SeedDraft::Custom(seed),
        }
    }

    /// Value to write as `level-seed`, if it changes.
    pub(crate) fn value(&self) -> Option<String> {
        match self {
            SeedDraft::Unchanged => None,
            SeedDraft::Random(seed) | SeedDraft::RandomForBlankCustom(seed) => {
                Some(seed.to_string())
            }
            SeedDraft::Custom(seed) => Some(seed.clone()),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            SeedDraft::Unchanged => "(unchanged)".to_string(),
            SeedDraft::Random(seed) => seed.to_string(),
            SeedDraft::RandomForBlankCustom(_) => "<empty custom_seed> -> random".to_string(),
            SeedDraft::Custom(seed) => seed.clone(),
        }
    }
}

/// Read the base name from its sidecar, normalizing it; initialize it from
/// `current` when the sidecar is missing.
///
/// With `persist` set, a missing or changed sidecar is rewritten. Sidecar I/O
/// failures are logged and fall back to the normalized current name.
pub(crate) fn resolve_base_name(files: &ServerFiles, current: &str, persist: bool) -> BaseName {
    let stored = match files.read_base_name() {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read base name, deriving from current level");
            return BaseName::normalize(current);
        }
    };

    let (base, needs_write) = match stored {
        Some(raw) => {
            let base = BaseName::normalize(&raw);
            let changed = base.as_str() != raw;
            if changed {
                tracing::info!(stored = %raw, normalized = %base, "Normalized stored base name");
            }
            (base, changed)
        }
        None => (BaseName::normalize(current), true),
    };

    if persist && needs_write {
        if let Err(e) = files.write_base_name(&base) {
            tracing::warn!(error = %e, "Could not write base name");
        }
    }
    base
}

/// Successor name: `new_level_name_format` rendered and sanitized.
pub(crate) fn draft_name(
    settings: &RotationSettings,
    base: &BaseName,
    now: DateTime<Utc>,
    random: &dyn RandomPort,
) -> InstanceName {
    let time = settings.time_format.format(&now.with_timezone(&Local));
    let id = short_id(&random.gen_uuid());
    let rendered = render(
        &settings.new_level_name_format,
        &NameTokens {
            name: base.as_str(),
            time: &time,
            id: &id,
        },
    );
    InstanceName::sanitize(&rendered, now)
}
