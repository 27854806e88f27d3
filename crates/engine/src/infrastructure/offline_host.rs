//! Host adapter for running without a game server.
//!
//! Used by the `worldcycle` binary to consume a pending rotation from a
//! wrapper script before the server is launched. There are no occupants,
//! broadcasts go to the log, and submitted tasks run inline.

use std::sync::Arc;

use worldcycle_domain::RotationNotice;

use super::ports::{HostError, HostPort, HostTask, OccupantPort};
use super::server_files::ServerFiles;

pub struct DirectoryHost {
    files: ServerFiles,
}

impl DirectoryHost {
    pub fn new(files: ServerFiles) -> Self {
        Self { files }
    }
}

impl HostPort for DirectoryHost {
    /// Wrapper scripts only ever manage dedicated servers.
    fn is_dedicated(&self) -> bool {
        true
    }

    fn is_hardcore(&self) -> bool {
        match self.files.load_host_config() {
            Ok(config) => config.hardcore().unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read host config for hardcore flag");
                false
            }
        }
    }

    fn occupants(&self) -> Vec<Arc<dyn OccupantPort>> {
        Vec::new()
    }

    fn broadcast(&self, notice: &RotationNotice) -> Result<(), HostError> {
        tracing::info!(notice = %notice, "Broadcast (offline)");
        Ok(())
    }

    fn submit(&self, task: HostTask) -> Result<(), HostError> {
        task();
        Ok(())
    }

    fn stop(&self) -> Result<(), HostError> {
        tracing::info!("Stop requested (offline, nothing to stop)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    #[test]
    fn hardcore_flag_comes_from_server_properties() {
        let dir = TempDir::new().expect("temp dir");
        let host = DirectoryHost::new(ServerFiles::new(dir.path()));
        assert!(!host.is_hardcore());

        fs::write(dir.path().join("server.properties"), "hardcore=true\n").expect("seed");
        assert!(host.is_hardcore());
        assert!(host.occupants().is_empty());
    }

    #[test]
    fn submitted_tasks_run_inline() {
        let dir = TempDir::new().expect("temp dir");
        let host = DirectoryHost::new(ServerFiles::new(dir.path()));
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        host.submit(Box::new(move || flag.store(true, Ordering::SeqCst)))
            .expect("submitted");
        assert!(ran.load(Ordering::SeqCst));
    }
}
