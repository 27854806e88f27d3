//! Record when the active world instance started.

use std::sync::Arc;

use worldcycle_domain::WorldStartRecord;

use crate::infrastructure::ports::ClockPort;
use crate::infrastructure::server_files::ServerFiles;
use crate::stores::WorldClock;

/// Restores the start time across restarts of the same instance and resets
/// it when the instance changed.
pub struct RecordWorldStart {
    files: ServerFiles,
    world_clock: Arc<WorldClock>,
    clock: Arc<dyn ClockPort>,
}

impl RecordWorldStart {
    pub fn new(files: ServerFiles, world_clock: Arc<WorldClock>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            files,
            world_clock,
            clock,
        }
    }

    pub fn execute(&self) -> WorldStartRecord {
        let active = match self.files.load_host_config() {
            Ok(config) => config.level_name(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read host config, assuming default level");
                worldcycle_domain::DEFAULT_LEVEL_NAME.to_string()
            }
        };
        let previous = self.files.read_world_start().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read world start record");
            None
        });

        let record = WorldStartRecord::restore_or_start(previous, &active, self.clock.now());
        self.world_clock.set(record.clone());
        if let Err(e) = self.files.write_world_start(&record) {
            tracing::warn!(error = %e, "Could not write world start record");
        }

        tracing::info!(
            level = %record.level_name,
            started_at = %record.started_at,
            "World start recorded"
        );
        record
    }
}
