//! Status snapshot for operators.

use std::sync::Arc;

use serde::Serialize;
use worldcycle_domain::format_uptime;

use crate::infrastructure::ports::{ClockPort, HostPort};
use crate::infrastructure::server_files::ServerFiles;
use crate::stores::{ProcessingGuard, WorldClock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub dedicated: bool,
    /// As reported by the running host.
    pub hardcore: bool,
    /// As written in `server.properties`; `None` when absent or unreadable.
    pub hardcore_in_config: Option<bool>,
    pub processing: bool,
    pub occupants: usize,
    pub rotation_pending: bool,
    pub level_name: Option<String>,
    /// `HH:MM:SS`
    pub world_uptime: String,
}

pub struct ReportStatus {
    host: Arc<dyn HostPort>,
    files: ServerFiles,
    guard: Arc<ProcessingGuard>,
    world_clock: Arc<WorldClock>,
    clock: Arc<dyn ClockPort>,
}

impl ReportStatus {
    pub fn new(
        host: Arc<dyn HostPort>,
        files: ServerFiles,
        guard: Arc<ProcessingGuard>,
        world_clock: Arc<WorldClock>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            host,
            files,
            guard,
            world_clock,
            clock,
        }
    }

    pub fn execute(&self) -> HostStatus {
        let config = match self.files.load_host_config() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read host config for status");
                None
            }
        };

        HostStatus {
            dedicated: self.host.is_dedicated(),
            hardcore: self.host.is_hardcore(),
            hardcore_in_config: config.as_ref().and_then(|c| c.hardcore()),
            processing: self.guard.is_held(),
            occupants: self.host.occupants().len(),
            rotation_pending: self.files.marker_exists(),
            level_name: config.map(|c| c.level_name()),
            world_uptime: format_uptime(self.world_clock.uptime(self.clock.now())),
        }
    }
}
