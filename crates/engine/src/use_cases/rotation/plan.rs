//! Plan the next world instance while the host is running.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use worldcycle_domain::{RotationMarker, RotationNotice, RotationTrigger};

use super::{draft_name, resolve_base_name, RefusalReason, RotationOutcome, SeedDraft};
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::ports::{ClockPort, HostPort, RandomPort, StoreError};
use crate::infrastructure::server_files::ServerFiles;
use crate::stores::{ProcessingGuard, WorldClock};
use crate::use_cases::panic_message;
use crate::use_cases::restart::{RestartScheduler, StopSchedule};

/// A rotation that is now pending: marker written, stop scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRotation {
    pub marker: RotationMarker,
    /// The broadcast text.
    pub notice: String,
    pub schedule: StopSchedule,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanRotationError {
    #[error("could not read host config: {0}")]
    HostConfigRead(#[source] StoreError),

    #[error("could not write host config: {0}")]
    HostConfigWrite(#[source] StoreError),

    /// The host config had already been rewritten when the marker failed.
    #[error("could not write rotation marker (host config rolled back: {rolled_back}): {source}")]
    MarkerWrite {
        #[source]
        source: StoreError,
        rolled_back: bool,
    },
}

pub struct PlanRotation {
    host: Arc<dyn HostPort>,
    files: ServerFiles,
    config: Arc<ConfigStore>,
    guard: Arc<ProcessingGuard>,
    world_clock: Arc<WorldClock>,
    scheduler: Arc<RestartScheduler>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
}

impl PlanRotation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: Arc<dyn HostPort>,
        files: ServerFiles,
        config: Arc<ConfigStore>,
        guard: Arc<ProcessingGuard>,
        world_clock: Arc<WorldClock>,
        scheduler: Arc<RestartScheduler>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            host,
            files,
            config,
            guard,
            world_clock,
            scheduler,
            clock,
            random,
        }
    }

    /// Rewrite the host config for the successor, persist the marker,
    /// broadcast the notice and schedule the stop.
    ///
    /// Nothing is written when the request is refused or fails before the
    /// marker. A marker failure rolls the host config back.
    pub fn execute(&self, trigger: RotationTrigger) -> Result<RotationOutcome, PlanRotationError> {
        if !self.host.is_dedicated() {
            return Ok(RotationOutcome::Refused(RefusalReason::NotDedicated));
        }
        if self.guard.is_held() {
            return Ok(RotationOutcome::Refused(RefusalReason::Processing));
        }
        if self.files.marker_exists() {
            tracing::info!(trigger = trigger.tag(), "Rotation already pending, refusing");
            return Ok(RotationOutcome::Refused(RefusalReason::RotationPending));
        }

        let settings = self.config.settings();
        let now = self.clock.now();

        let mut host_config = self
            .files
            .load_host_config()
            .map_err(PlanRotationError::HostConfigRead)?;
        let current = host_config.level_name();
        let base = resolve_base_name(&self.files, &current, true);
        let new_name = draft_name(&settings, &base, now, self.random.as_ref());
        let seed = SeedDraft::draw(settings.seed_policy(), self.random.as_ref());
        let new_seed = seed.value();

        host_config.set_level_name(&new_name);
        if let Some(value) = &new_seed {
            host_config.set_level_seed(value);
        }
        self.files
            .store_host_config(&host_config)
            .map_err(PlanRotationError::HostConfigWrite)?;

        let marker = RotationMarker {
            requested_by: trigger.tag().to_string(),
            requested_at: now,
            old_level_name: current,
            new_level_name: new_name,
            base_level_name: base,
            new_seed,
        };
        if let Err(source) = self.files.write_marker(&marker) {
            tracing::error!(error = %source, "Could not write rotation marker, rolling back host config");
            let rolled_back = match self.files.restore_host_config(&host_config) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(error = %e, "Host config rollback failed");
                    false
                }
            };
            return Err(PlanRotationError::MarkerWrite {
                source,
                rolled_back,
            });
        }

        tracing::info!(
            requested_by = %marker.requested_by,
            old = %marker.old_level_name,
            new = %marker.new_level_name,
            base = %marker.base_level_name,
            seed = %seed.describe(),
            "Rotation planned"
        );

        let notice = RotationNotice {
            trigger,
            world_uptime: self.world_clock.uptime(now),
            restart_delay_seconds: settings.restart_delay_seconds,
        };
        // The marker is on disk: nothing from here on may skip the stop.
        match catch_unwind(AssertUnwindSafe(|| self.host.broadcast(&notice))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Could not broadcast rotation notice"),
            Err(payload) => tracing::warn!(
                panic = %panic_message(payload.as_ref()),
                "Rotation notice broadcast panicked"
            ),
        }

        let schedule = self
            .scheduler
            .schedule_stop(settings.restart_delay(), settings.auto_restart);

        Ok(RotationOutcome::Planned(PlannedRotation {
            marker,
            notice: notice.to_string(),
            schedule,
        }))
    }
}
