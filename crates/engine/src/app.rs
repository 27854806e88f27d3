//! Application state and composition.
//!
//! [`App`] owns every piece of orchestrator state and exposes the entry
//! points the host and the command front end call into. Entry points never
//! return errors or let panics escape: failures are logged and reported as
//! outcome values.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use worldcycle_domain::{
    format_uptime, ActorId, PendingAction, RotationSettings, RotationTrigger, WorldStartRecord,
};

use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    config_store::ConfigStore,
    ports::{ClockPort, HostPort, RandomPort},
    retirement::RetirementChain,
    server_files::ServerFiles,
};
use crate::stores::{ConfirmationRegistry, ProcessingGuard, WorldClock};
use crate::use_cases::{
    panic_message, ApplyOutcome, ApplyRotation, HostStatus, PlanRotation, PreviewRotation,
    RecordWorldStart, RefusalReason, ReportStatus, RestartScheduler, RotationOutcome,
    RotationPreview, TerminateOccupants, TerminateOutcome,
};

/// Main application state.
pub struct App {
    pub stores: Stores,
    pub use_cases: UseCases,
    host: Arc<dyn HostPort>,
    files: ServerFiles,
    config: Arc<ConfigStore>,
    clock: Arc<dyn ClockPort>,
}

/// In-memory state, never persisted.
pub struct Stores {
    pub confirmations: Arc<ConfirmationRegistry>,
    pub guard: Arc<ProcessingGuard>,
    pub world_clock: Arc<WorldClock>,
}

/// Container for all use cases.
pub struct UseCases {
    pub terminate: Arc<TerminateOccupants>,
    pub plan: Arc<PlanRotation>,
    pub apply: Arc<ApplyRotation>,
    pub preview: Arc<PreviewRotation>,
    pub status: Arc<ReportStatus>,
    pub world_start: Arc<RecordWorldStart>,
    pub scheduler: Arc<RestartScheduler>,
}

/// Answer to a destructive command before it is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    ConfirmationRequired {
        action: PendingAction,
        expires_at: DateTime<Utc>,
    },
    Refused { reason: RefusalReason },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// No request, or it expired.
    NothingPending,
    Executed {
        action: PendingAction,
        /// Set for terminate-and-rotate.
        terminated: Option<TerminateOutcome>,
        rotation: RotationOutcome,
    },
    /// The request was live but the server changed since it was made. The
    /// request is consumed.
    Refused {
        action: PendingAction,
        reason: RefusalReason,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathOutcome {
    Ignored(RefusalReason),
    Handled {
        terminated: TerminateOutcome,
        rotation: RotationOutcome,
    },
    Failed(String),
}

impl App {
    /// Wire the orchestrator for the server rooted at `server_root`, with
    /// settings from `worldcycle.properties` and the environment.
    pub fn new(host: Arc<dyn HostPort>, server_root: impl Into<PathBuf>) -> Self {
        let files = ServerFiles::new(server_root);
        let config = Arc::new(ConfigStore::new(files.settings_path()));
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let random: Arc<dyn RandomPort> = Arc::new(SystemRandom::new());
        Self::with_ports(host, files, config, clock, random)
    }

    pub fn with_ports(
        host: Arc<dyn HostPort>,
        files: ServerFiles,
        config: Arc<ConfigStore>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let stores = Stores {
            confirmations: Arc::new(ConfirmationRegistry::new(clock.clone())),
            guard: Arc::new(ProcessingGuard::new()),
            world_clock: Arc::new(WorldClock::new()),
        };

        let scheduler = Arc::new(RestartScheduler::new(host.clone()));
        let use_cases = UseCases {
            terminate: Arc::new(TerminateOccupants::new(host.clone(), stores.guard.clone())),
            plan: Arc::new(PlanRotation::new(
                host.clone(),
                files.clone(),
                config.clone(),
                stores.guard.clone(),
                stores.world_clock.clone(),
                scheduler.clone(),
                clock.clone(),
                random.clone(),
            )),
            apply: Arc::new(ApplyRotation::new(
                files.clone(),
                config.clone(),
                RetirementChain::standard(),
                clock.clone(),
                random.clone(),
            )),
            preview: Arc::new(PreviewRotation::new(
                files.clone(),
                config.clone(),
                clock.clone(),
                random,
            )),
            status: Arc::new(ReportStatus::new(
                host.clone(),
                files.clone(),
                stores.guard.clone(),
                stores.world_clock.clone(),
                clock.clone(),
            )),
            world_start: Arc::new(RecordWorldStart::new(
                files.clone(),
                stores.world_clock.clone(),
                clock.clone(),
            )),
            scheduler,
        };

        Self {
            stores,
            use_cases,
            host,
            files,
            config,
            clock,
        }
    }

    pub fn files(&self) -> &ServerFiles {
        &self.files
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Ask `actor` to confirm killing everyone and rotating the world.
    pub fn request_terminate_and_rotate(&self, actor: ActorId) -> CommandOutcome {
        self.boundary(
            "request_terminate_and_rotate",
            |message| CommandOutcome::Failed { message },
            || {
                if let Some(reason) = self.command_refusal(true) {
                    return CommandOutcome::Refused { reason };
                }
                self.register(actor, PendingAction::TerminateAndRotate)
            },
        )
    }

    /// Ask `actor` to confirm a rotation without killing anyone.
    pub fn request_rotation(&self, actor: ActorId) -> CommandOutcome {
        self.boundary(
            "request_rotation",
            |message| CommandOutcome::Failed { message },
            || {
                if let Some(reason) = self.command_refusal(false) {
                    return CommandOutcome::Refused { reason };
                }
                self.register(actor, PendingAction::Rotate)
            },
        )
    }

    /// Run whatever `actor` asked for, if the request is still live.
    pub fn confirm(&self, actor: ActorId) -> ConfirmOutcome {
        self.boundary("confirm", ConfirmOutcome::Failed, || {
            let Some(action) = self.stores.confirmations.take(actor) else {
                tracing::info!(actor = %actor, "Nothing to confirm");
                return ConfirmOutcome::NothingPending;
            };
            if let Some(reason) = self.command_refusal(action == PendingAction::TerminateAndRotate) {
                tracing::info!(actor = %actor, reason = %reason, "Confirmed request no longer allowed");
                return ConfirmOutcome::Refused { action, reason };
            }
            tracing::info!(actor = %actor, action = action.describe(), "Confirmed");

            let terminated = match action {
                PendingAction::TerminateAndRotate => Some(self.use_cases.terminate.execute()),
                PendingAction::Rotate => None,
            };
            let rotation = self.plan(RotationTrigger::command(actor));
            ConfirmOutcome::Executed {
                action,
                terminated,
                rotation,
            }
        })
    }

    /// Kill every occupant. `None` when the operation itself blew up.
    pub fn terminate_all_occupants(&self) -> Option<TerminateOutcome> {
        self.boundary(
            "terminate_all_occupants",
            |_| None,
            || Some(self.use_cases.terminate.execute()),
        )
    }

    pub fn preview_next_rotation(&self) -> Option<RotationPreview> {
        self.boundary(
            "preview_next_rotation",
            |_| None,
            || match self.use_cases.preview.execute() {
                Ok(preview) => Some(preview),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not preview rotation");
                    None
                }
            },
        )
    }

    pub fn current_status(&self) -> Option<HostStatus> {
        self.boundary(
            "current_status",
            |_| None,
            || Some(self.use_cases.status.execute()),
        )
    }

    /// Uptime of the loaded world as `HH:MM:SS`.
    pub fn world_uptime(&self) -> String {
        self.boundary(
            "world_uptime",
            |_| format_uptime(chrono::Duration::zero()),
            || format_uptime(self.stores.world_clock.uptime(self.clock.now())),
        )
    }

    pub fn effective_settings(&self) -> RotationSettings {
        self.boundary(
            "effective_settings",
            |_| RotationSettings::default(),
            || self.config.settings(),
        )
    }

    pub fn reload_config(&self) -> RotationSettings {
        self.boundary(
            "reload_config",
            |_| RotationSettings::default(),
            || {
                self.config.reload();
                let settings = self.config.settings();
                tracing::info!(settings = ?settings, "Settings reloaded");
                settings
            },
        )
    }

    // =========================================================================
    // Host hooks
    // =========================================================================

    /// An occupant died. In a hardcore world on a dedicated host this ends
    /// the world: everyone else is killed and a rotation is planned.
    pub fn on_occupant_death(&self, occupant: &str) -> DeathOutcome {
        self.boundary("on_occupant_death", DeathOutcome::Failed, || {
            if !self.host.is_dedicated() {
                return DeathOutcome::Ignored(RefusalReason::NotDedicated);
            }
            if !self.host.is_hardcore() {
                return DeathOutcome::Ignored(RefusalReason::NotHardcore);
            }
            if self.stores.guard.is_held() {
                tracing::debug!(occupant = %occupant, "Death during termination, ignoring");
                return DeathOutcome::Ignored(RefusalReason::Processing);
            }

            tracing::info!(occupant = %occupant, "Hardcore death, ending world");
            let terminated = self.use_cases.terminate.execute();
            let rotation = self.plan(RotationTrigger::death(occupant));
            DeathOutcome::Handled {
                terminated,
                rotation,
            }
        })
    }

    /// Host is starting and has not loaded its world yet.
    pub fn on_host_starting(&self) -> Option<ApplyOutcome> {
        self.boundary(
            "on_host_starting",
            |_| None,
            || {
                self.config.reload();
                match self.use_cases.apply.execute() {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        tracing::error!(error = %e, "Could not apply rotation");
                        None
                    }
                }
            },
        )
    }

    /// Host finished starting; the world is loaded.
    pub fn on_host_started(&self) -> Option<WorldStartRecord> {
        self.boundary(
            "on_host_started",
            |_| None,
            || Some(self.use_cases.world_start.execute()),
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn command_refusal(&self, requires_hardcore: bool) -> Option<RefusalReason> {
        if !self.host.is_dedicated() {
            return Some(RefusalReason::NotDedicated);
        }
        if requires_hardcore && !self.host.is_hardcore() {
            return Some(RefusalReason::NotHardcore);
        }
        if self.files.marker_exists() {
            return Some(RefusalReason::RotationPending);
        }
        if self.stores.guard.is_held() {
            return Some(RefusalReason::Processing);
        }
        None
    }

    fn register(&self, actor: ActorId, action: PendingAction) -> CommandOutcome {
        let timeout = self.config.settings().confirm_timeout();
        let expires_at = self.stores.confirmations.request(actor, action, timeout);
        tracing::info!(
            actor = %actor,
            action = action.describe(),
            expires_at = %expires_at,
            "Awaiting confirmation"
        );
        CommandOutcome::ConfirmationRequired { action, expires_at }
    }

    fn plan(&self, trigger: RotationTrigger) -> RotationOutcome {
        match self.use_cases.plan.execute(trigger) {
            Ok(outcome) => {
                if let RotationOutcome::Refused(reason) = &outcome {
                    tracing::info!(reason = %reason, "Rotation refused");
                }
                outcome
            }
            Err(e) => {
                tracing::error!(error = %e, "Rotation failed");
                RotationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run `op`, turning a panic into `fallback(message)`.
    fn boundary<T>(
        &self,
        entry_point: &'static str,
        fallback: impl FnOnce(String) -> T,
        op: impl FnOnce() -> T,
    ) -> T {
        match catch_unwind(AssertUnwindSafe(op)) {
            Ok(value) => value,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(entry_point, panic = %message, "Entry point panicked");
                fallback(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{HostError, HostTask, OccupantPort};
    use crate::test_fixtures::{fixed_random, FakeHost, FakeOccupant, ManualClock, ServerDir};
    use worldcycle_domain::RotationNotice;

    struct Harness {
        dir: ServerDir,
        host: Arc<FakeHost>,
        clock: Arc<ManualClock>,
        app: App,
    }

    fn harness() -> Harness {
        let dir = ServerDir::new();
        dir.write_host_config("hardcore=true\nlevel-name=world\n");
        dir.write_settings("restart_delay_seconds=3600\n");
        let host = FakeHost::dedicated_hardcore();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let app = App::with_ports(
            host.clone(),
            dir.files(),
            Arc::new(dir.config()),
            clock.clone(),
            Arc::new(fixed_random()),
        );
        Harness {
            dir,
            host,
            clock,
            app,
        }
    }

    #[test]
    fn confirm_without_request_does_nothing() {
        let h = harness();
        assert_eq!(h.app.confirm(ActorId::console()), ConfirmOutcome::NothingPending);
        assert!(!h.dir.files().marker_exists());
    }

    #[test]
    fn terminate_and_rotate_requires_hardcore() {
        let h = harness();
        h.host.set_hardcore(false);
        assert_eq!(
            h.app.request_terminate_and_rotate(ActorId::console()),
            CommandOutcome::Refused {
                reason: RefusalReason::NotHardcore
            }
        );
        assert!(matches!(
            h.app.request_rotation(ActorId::console()),
            CommandOutcome::ConfirmationRequired {
                action: PendingAction::Rotate,
                ..
            }
        ));
    }

    #[test]
    fn confirmed_rotation_plans_without_killing() {
        let h = harness();
        let steve = Arc::new(FakeOccupant::new("Steve"));
        h.host.set_occupants(vec![steve.clone()]);

        h.app.request_rotation(ActorId::console());
        let outcome = h.app.confirm(ActorId::console());

        let ConfirmOutcome::Executed {
            action,
            terminated,
            rotation,
        } = outcome
        else {
            panic!("expected execution, got {:?}", outcome);
        };
        assert_eq!(action, PendingAction::Rotate);
        assert_eq!(terminated, None);
        assert!(rotation.is_planned());
        assert!(steve.is_alive());
        assert!(h.dir.files().marker_exists());
    }

    #[test]
    fn expired_request_cannot_be_confirmed() {
        let h = harness();
        h.app.request_terminate_and_rotate(ActorId::console());
        h.clock.advance(chrono::Duration::milliseconds(30_001));

        assert_eq!(h.app.confirm(ActorId::console()), ConfirmOutcome::NothingPending);
        assert!(!h.dir.files().marker_exists());
    }

    #[test]
    fn confirm_rechecks_refusals_before_executing() {
        let h = harness();
        let steve = Arc::new(FakeOccupant::new("Steve"));
        h.host.set_occupants(vec![steve.clone()]);

        h.app.request_terminate_and_rotate(ActorId::console());
        h.dir.write_marker("world");

        assert_eq!(
            h.app.confirm(ActorId::console()),
            ConfirmOutcome::Refused {
                action: PendingAction::TerminateAndRotate,
                reason: RefusalReason::RotationPending,
            }
        );
        assert!(steve.is_alive());
        assert_eq!(h.app.confirm(ActorId::console()), ConfirmOutcome::NothingPending);
    }

    #[test]
    fn confirm_refuses_terminate_after_hardcore_is_turned_off() {
        let h = harness();
        let steve = Arc::new(FakeOccupant::new("Steve"));
        h.host.set_occupants(vec![steve.clone()]);

        h.app.request_terminate_and_rotate(ActorId::console());
        h.host.set_hardcore(false);

        assert_eq!(
            h.app.confirm(ActorId::console()),
            ConfirmOutcome::Refused {
                action: PendingAction::TerminateAndRotate,
                reason: RefusalReason::NotHardcore,
            }
        );
        assert!(steve.is_alive());
        assert!(!h.dir.files().marker_exists());
    }

    #[test]
    fn confirm_refuses_while_termination_is_running() {
        let h = harness();
        h.app.request_rotation(ActorId::console());

        let permit = h.app.stores.guard.try_acquire();
        assert!(permit.is_some());
        assert_eq!(
            h.app.confirm(ActorId::console()),
            ConfirmOutcome::Refused {
                action: PendingAction::Rotate,
                reason: RefusalReason::Processing,
            }
        );
        drop(permit);
        assert!(!h.dir.files().marker_exists());
    }

    #[test]
    fn reload_picks_up_edited_settings() {
        let h = harness();
        assert_eq!(h.app.effective_settings().restart_delay_seconds, 3600);

        h.dir.write_settings("restart_delay_seconds=7\n");

        assert_eq!(h.app.reload_config().restart_delay_seconds, 7);
        assert_eq!(h.app.effective_settings().restart_delay_seconds, 7);
    }

    #[test]
    fn death_outside_hardcore_is_ignored() {
        let h = harness();
        h.host.set_hardcore(false);
        assert_eq!(
            h.app.on_occupant_death("Steve"),
            DeathOutcome::Ignored(RefusalReason::NotHardcore)
        );
        h.host.set_hardcore(true);
        h.host.set_dedicated(false);
        assert_eq!(
            h.app.on_occupant_death("Steve"),
            DeathOutcome::Ignored(RefusalReason::NotDedicated)
        );
    }

    #[test]
    fn panicking_occupant_enumeration_stays_inside_the_boundary() {
        struct ExplodingHost;

        impl HostPort for ExplodingHost {
            fn is_dedicated(&self) -> bool {
                true
            }
            fn is_hardcore(&self) -> bool {
                true
            }
            fn occupants(&self) -> Vec<Arc<dyn OccupantPort>> {
                panic!("occupant list unavailable")
            }
            fn broadcast(&self, _notice: &RotationNotice) -> Result<(), HostError> {
                Ok(())
            }
            fn submit(&self, task: HostTask) -> Result<(), HostError> {
                task();
                Ok(())
            }
            fn stop(&self) -> Result<(), HostError> {
                Ok(())
            }
        }

        let dir = ServerDir::new();
        let app = App::with_ports(
            Arc::new(ExplodingHost),
            dir.files(),
            Arc::new(dir.config()),
            Arc::new(ManualClock::new(Utc::now())),
            Arc::new(fixed_random()),
        );

        assert_eq!(app.terminate_all_occupants(), None);
        assert_eq!(app.current_status(), None);
        assert!(!app.stores.guard.is_held());
    }

    #[test]
    fn panicking_clock_stays_inside_the_boundary() {
        struct BrokenClock;

        impl ClockPort for BrokenClock {
            fn now(&self) -> DateTime<Utc> {
                panic!("clock source unavailable")
            }
        }

        let dir = ServerDir::new();
        let app = App::with_ports(
            FakeHost::dedicated_hardcore(),
            dir.files(),
            Arc::new(dir.config()),
            Arc::new(BrokenClock),
            Arc::new(fixed_random()),
        );

        assert_eq!(app.world_uptime(), "00:00:00");
    }
}
