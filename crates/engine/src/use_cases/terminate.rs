//! Terminate every occupant of the world instance.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use super::panic_message;
use crate::infrastructure::ports::{HostError, HostPort, OccupantPort};
use crate::stores::ProcessingGuard;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    /// Killed by the regular primitive.
    pub killed: usize,
    /// Killed by forcing vitality to zero after the regular primitive failed.
    pub fallbacks: usize,
    /// Neither primitive worked.
    pub failures: usize,
    /// Already dead.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    Completed(TerminationReport),
    /// Another terminate is running (often the death events it caused).
    AlreadyProcessing,
}

enum Termination {
    Killed,
    Fallback,
    Skipped,
}

/// Kill all occupants under the processing guard.
///
/// Failures are isolated per occupant: one broken occupant never stops the
/// rest from being processed.
pub struct TerminateOccupants {
    host: Arc<dyn HostPort>,
    guard: Arc<ProcessingGuard>,
}

impl TerminateOccupants {
    pub fn new(host: Arc<dyn HostPort>, guard: Arc<ProcessingGuard>) -> Self {
        Self { host, guard }
    }

    pub fn execute(&self) -> TerminateOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            tracing::info!("Terminate already in progress, ignoring");
            return TerminateOutcome::AlreadyProcessing;
        };

        let mut report = TerminationReport::default();
        for (index, occupant) in self.host.occupants().into_iter().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| terminate_one(occupant.as_ref())));
            match result {
                Ok(Ok(Termination::Killed)) => report.killed += 1,
                Ok(Ok(Termination::Fallback)) => report.fallbacks += 1,
                Ok(Ok(Termination::Skipped)) => report.skipped += 1,
                Ok(Err(e)) => {
                    tracing::warn!(occupant = index, error = %e, "Could not terminate occupant");
                    report.failures += 1;
                }
                Err(payload) => {
                    tracing::warn!(
                        occupant = index,
                        panic = %panic_message(payload.as_ref()),
                        "Occupant termination panicked"
                    );
                    report.failures += 1;
                }
            }
        }

        tracing::info!(
            killed = report.killed,
            fallbacks = report.fallbacks,
            failures = report.failures,
            skipped = report.skipped,
            "Terminated occupants"
        );
        TerminateOutcome::Completed(report)
    }
}

fn terminate_one(occupant: &dyn OccupantPort) -> Result<Termination, HostError> {
    if !occupant.is_alive() {
        return Ok(Termination::Skipped);
    }

    let name = occupant.name();
    match catch_unwind(AssertUnwindSafe(|| occupant.mark_dead())) {
        Ok(Ok(())) => return Ok(Termination::Killed),
        Ok(Err(e)) => {
            tracing::debug!(occupant = %name, error = %e, "mark_dead failed, forcing vitality to zero")
        }
        Err(payload) => tracing::warn!(
            occupant = %name,
            panic = %panic_message(payload.as_ref()),
            "mark_dead panicked, forcing vitality to zero"
        ),
    }

    occupant.force_zero_vitality()?;
    Ok(Termination::Fallback)
}
