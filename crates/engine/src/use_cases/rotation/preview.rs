//! Dry run of the next rotation plan.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{draft_name, resolve_base_name, SeedDraft};
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::ports::{ClockPort, RandomPort, StoreError};
use crate::infrastructure::server_files::ServerFiles;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationPreview {
    pub current_level_name: String,
    pub base_level_name: String,
    pub new_level_name: String,
    /// Seed as it would be applied, e.g. `(unchanged)`.
    pub seed: String,
    pub rotation_pending: bool,
}

impl fmt::Display for RotationPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Preview rotation => new level-name: '{}', seed: {}",
            self.new_level_name, self.seed
        )
    }
}

/// Same naming and seed logic as a real plan, without writing any file.
pub struct PreviewRotation {
    files: ServerFiles,
    config: Arc<ConfigStore>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
}

impl PreviewRotation {
    pub fn new(
        files: ServerFiles,
        config: Arc<ConfigStore>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            files,
            config,
            clock,
            random,
        }
    }

    pub fn execute(&self) -> Result<RotationPreview, StoreError> {
        let settings = self.config.settings();
        let current = self.files.load_host_config()?.level_name();
        let base = resolve_base_name(&self.files, &current, false);
        let new_name = draft_name(&settings, &base, self.clock.now(), self.random.as_ref());
        let seed = SeedDraft::draw(settings.seed_policy(), self.random.as_ref());

        Ok(RotationPreview {
            base_level_name: base.to_string(),
            new_level_name: new_name.to_string(),
            seed: seed.describe(),
            rotation_pending: self.files.marker_exists(),
            current_level_name: current,
        })
    }
}
