//! Consume a pending rotation marker at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use worldcycle_domain::{
    render, short_id, InstanceName, NameTokens, RetirePolicy, RotationSettings, TimePattern,
};

use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::ports::{ClockPort, RandomPort, StoreError};
use crate::infrastructure::retirement::{delete_tree, RetirementChain};
use crate::infrastructure::server_files::ServerFiles;

/// Used when `backup_folder_name` would escape the server root.
const FALLBACK_BACKUP_FOLDER: &str = "Old Worlds";

/// What happened to the retired instance directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetiredDisposition {
    /// Nothing on disk under the retired name.
    Missing,
    /// The recorded name is not a plain directory name; left alone.
    UnsafeName,
    BackedUp {
        target: PathBuf,
        strategy: &'static str,
    },
    /// Every backup strategy failed; the directory is left where it was.
    BackupFailed { attempts: Vec<String> },
    Deleted { removed: usize, failures: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyOutcome {
    NoMarker,
    Applied {
        retired: String,
        disposition: RetiredDisposition,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyRotationError {
    /// The retired world was processed but the marker is still there, so the
    /// next start would process it again.
    #[error("could not remove rotation marker: {0}")]
    MarkerRemove(#[source] StoreError),
}

pub struct ApplyRotation {
    files: ServerFiles,
    config: Arc<ConfigStore>,
    chain: RetirementChain,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
}

impl ApplyRotation {
    pub fn new(
        files: ServerFiles,
        config: Arc<ConfigStore>,
        chain: RetirementChain,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            files,
            config,
            chain,
            clock,
            random,
        }
    }

    /// Retire the instance named by the marker, then remove the marker.
    ///
    /// Must run before the host loads its world. Retirement problems are
    /// logged and reported in the outcome; only a marker that cannot be
    /// removed is an error.
    pub fn execute(&self) -> Result<ApplyOutcome, ApplyRotationError> {
        if !self.files.marker_exists() {
            tracing::debug!("No rotation marker, nothing to apply");
            return Ok(ApplyOutcome::NoMarker);
        }

        let settings = self.config.settings();
        let retired = self.retired_name();
        let disposition = self.retire(&settings, &retired);

        self.files
            .remove_marker()
            .map_err(ApplyRotationError::MarkerRemove)?;
        tracing::info!(retired = %retired, disposition = ?disposition, "Rotation applied");

        Ok(ApplyOutcome::Applied {
            retired,
            disposition,
        })
    }

    /// Marker `old-level-name`, or the host config's level name when the
    /// marker is unreadable or lacks it.
    fn retired_name(&self) -> String {
        match self.files.read_marker_retired_name() {
            Ok(Some(name)) => return name,
            Ok(None) => tracing::warn!("Marker has no old-level-name, using host config"),
            Err(e) => tracing::warn!(error = %e, "Could not read marker, using host config"),
        }
        match self.files.load_host_config() {
            Ok(config) => config.level_name(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read host config, assuming default level");
                worldcycle_domain::DEFAULT_LEVEL_NAME.to_string()
            }
        }
    }

    fn retire(&self, settings: &RotationSettings, retired: &str) -> RetiredDisposition {
        let Some(source) = self.files.instance_dir(retired) else {
            tracing::warn!(retired = %retired, "Retired name is not a plain directory name, leaving it alone");
            return RetiredDisposition::UnsafeName;
        };
        if !source.is_dir() {
            tracing::info!(dir = %source.display(), "Retired world directory not found");
            return RetiredDisposition::Missing;
        }

        match settings.retire_policy() {
            RetirePolicy::Backup => self.back_up(settings, retired, &source),
            RetirePolicy::Delete => {
                let report = delete_tree(&source);
                tracing::info!(
                    dir = %source.display(),
                    removed = report.removed,
                    failures = report.failures.len(),
                    "Deleted retired world"
                );
                RetiredDisposition::Deleted {
                    removed: report.removed,
                    failures: report.failures.len(),
                }
            }
        }
    }

    fn back_up(&self, settings: &RotationSettings, retired: &str, source: &Path) -> RetiredDisposition {
        let backup_root = self
            .files
            .backup_root(&settings.backup_folder_name)
            .unwrap_or_else(|| {
                tracing::warn!(
                    folder = %settings.backup_folder_name,
                    "Backup folder escapes the server root, using default"
                );
                self.files.root().join(FALLBACK_BACKUP_FOLDER)
            });
        if let Err(e) = fs::create_dir_all(&backup_root) {
            tracing::warn!(dir = %backup_root.display(), error = %e, "Could not create backup folder");
        }

        let target = self.backup_target(settings, retired, &backup_root);
        match self.chain.run(source, &target) {
            Ok(strategy) => {
                tracing::info!(
                    source = %source.display(),
                    target = %target.display(),
                    strategy,
                    "Backed up retired world"
                );
                RetiredDisposition::BackedUp { target, strategy }
            }
            Err(e) => {
                tracing::error!(source = %source.display(), error = %e, "Could not back up retired world");
                RetiredDisposition::BackupFailed {
                    attempts: e
                        .attempts
                        .iter()
                        .map(|(name, err)| format!("{}: {}", name, err))
                        .collect(),
                }
            }
        }
    }

    /// `backup_name_format` under `backup_root`, disambiguated with the short
    /// id when that name is taken.
    fn backup_target(&self, settings: &RotationSettings, retired: &str, backup_root: &Path) -> PathBuf {
        let now = self.clock.now();
        let ts = TimePattern::backup_timestamp().format(&now.with_timezone(&Local));
        let id = short_id(&self.random.gen_uuid());
        let name = InstanceName::sanitize(
            &render(
                &settings.backup_name_format,
                &NameTokens {
                    name: retired,
                    time: &ts,
                    id: &id,
                },
            ),
            now,
        );

        let target = backup_root.join(name.as_str());
        if target.exists() {
            backup_root.join(format!("{}_{}", name, id))
        } else {
            target
        }
    }
}
