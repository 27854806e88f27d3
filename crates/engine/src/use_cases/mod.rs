//! Use cases - orchestration of the rotation lifecycle.
//!
//! Each module holds one operation. `App` wires them together and exposes
//! them as the orchestrator's entry points.

use std::any::Any;

pub mod restart;
pub mod rotation;
pub mod status;
pub mod terminate;
pub mod world_start;

// Re-export main types
pub use restart::{RestartScheduler, StopSchedule};
pub use rotation::{
    ApplyOutcome, ApplyRotation, ApplyRotationError, PlanRotation, PlanRotationError,
    PlannedRotation, PreviewRotation, RefusalReason, RetiredDisposition, RotationOutcome,
    RotationPreview,
};
pub use status::{HostStatus, ReportStatus};
pub use terminate::{TerminateOccupants, TerminateOutcome, TerminationReport};
pub use world_start::RecordWorldStart;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
