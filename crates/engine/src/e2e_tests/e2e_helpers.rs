//! E2E test helpers for constructing the full application stack.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::app::App;
use crate::test_fixtures::{fixed_random, wait_until, FakeHost, ManualClock, ServerDir};
use crate::use_cases::{ApplyOutcome, PlannedRotation, RotationOutcome};

pub const HOST_CONFIG: &str = "\
#Minecraft server properties
allow-flight=false
hardcore=true
level-name=world
level-seed=
motd=A Hardcore Server
";

/// 2025-10-22 14:02:31 in the local zone.
pub fn first_start() -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2025, 10, 22, 14, 2, 31)
        .earliest()
        .expect("valid local time")
        .with_timezone(&Utc)
}

/// A server directory, a fake host and an `App` wired to both.
pub struct E2ETestContext {
    pub dir: ServerDir,
    pub host: Arc<FakeHost>,
    pub clock: Arc<ManualClock>,
    pub app: Arc<App>,
}

impl E2ETestContext {
    /// Hardcore server on `world` with the host's stop firing right away.
    pub fn setup() -> Self {
        Self::with_settings("")
    }

    pub fn with_settings(extra: &str) -> Self {
        let dir = ServerDir::new();
        dir.write_host_config(HOST_CONFIG);
        dir.write_settings(&format!("restart_delay_seconds=0\n{}", extra));
        dir.create_world("world");

        let host = FakeHost::dedicated_hardcore();
        let clock = Arc::new(ManualClock::new(first_start()));
        let app = Arc::new(App::with_ports(
            host.clone(),
            dir.files(),
            Arc::new(dir.config()),
            clock.clone(),
            Arc::new(fixed_random()),
        ));
        app.on_host_started();

        Self {
            dir,
            host,
            clock,
            app,
        }
    }

    pub fn level_name(&self) -> String {
        self.dir
            .files()
            .load_host_config()
            .expect("host config")
            .level_name()
    }

    /// Wait for the scheduled stop, then start the host again: apply the
    /// rotation, let the host create the world it now names, and record it.
    pub fn restart_host(&self, stops_before: usize) -> ApplyOutcome {
        assert!(
            wait_until(Duration::from_secs(5), || self.host.stop_count() > stops_before),
            "host was never stopped"
        );

        let applied = self.app.on_host_starting().expect("apply succeeded");
        self.dir.create_world(&self.level_name());
        self.app.on_host_started().expect("world start recorded");
        applied
    }
}

pub fn expect_planned(outcome: &RotationOutcome) -> &PlannedRotation {
    match outcome {
        RotationOutcome::Planned(planned) => planned,
        other => panic!("expected a planned rotation, got {:?}", other),
    }
}

/// Names of the entries in the backup folder, sorted.
pub fn backups(ctx: &E2ETestContext) -> Vec<String> {
    let Ok(entries) = fs::read_dir(ctx.dir.path().join("Old Worlds")) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
