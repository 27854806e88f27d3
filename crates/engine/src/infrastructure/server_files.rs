//! Files the orchestrator owns or edits in the server root.
//!
//! Every write goes through [`write_atomic`]: the new content is written to a
//! temp file in the same directory, synced, and renamed over the target, so a
//! crash leaves either the old or the new file and never a torn one.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;
use worldcycle_domain::value_objects::settings::parse_bool;
use worldcycle_domain::{
    BaseName, InstanceName, RotationMarker, WorldStartRecord, DEFAULT_LEVEL_NAME,
};

use super::ports::StoreError;
use super::properties::{decode_text, PropertiesDocument};

pub const HOST_CONFIG_FILE: &str = "server.properties";
pub const MARKER_FILE: &str = "hc_reset.flag";
pub const BASE_NAME_FILE: &str = "hc_base_name.txt";
pub const WORLD_START_FILE: &str = "hc_world_start.flag";
pub const SETTINGS_FILE: &str = "worldcycle.properties";

pub const LEVEL_NAME_KEY: &str = "level-name";
pub const LEVEL_SEED_KEY: &str = "level-seed";
pub const HARDCORE_KEY: &str = "hardcore";

const MARKER_REQUESTED_BY: &str = "requestedBy";
const MARKER_TIME: &str = "time";
const MARKER_OLD_NAME: &str = "old-level-name";
const MARKER_NEW_NAME: &str = "new-level-name";
const MARKER_BASE_NAME: &str = "base-level-name";
const MARKER_NEW_SEED: &str = "new-seed";

const START_LEVEL_NAME: &str = "level-name";
const START_TIME: &str = "start";

// =============================================================================
// Atomic write
// =============================================================================

/// Replace `path` with `contents` via temp file + rename in the same directory.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp_file =
        NamedTempFile::new_in(parent).map_err(|e| StoreError::io("create temp file", parent, e))?;
    temp_file
        .write_all(contents)
        .map_err(|e| StoreError::io("write temp file", temp_file.path(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| StoreError::io("sync temp file", temp_file.path(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| StoreError::io("replace file", path, e.error))?;

    Ok(())
}

fn read_optional(path: &Path, operation: &'static str) -> Result<Option<String>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(decode_text(bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(operation, path, e)),
    }
}

// =============================================================================
// Host config
// =============================================================================

/// The host's `server.properties`, with the text it was loaded from.
#[derive(Debug, Clone)]
pub struct HostConfig {
    document: PropertiesDocument,
    original: Option<String>,
}

impl HostConfig {
    pub fn from_text(text: Option<String>) -> Self {
        let document = text
            .as_deref()
            .map(PropertiesDocument::parse)
            .unwrap_or_default();
        Self {
            document,
            original: text,
        }
    }

    /// Current `level-name`, `world` when absent or blank.
    pub fn level_name(&self) -> String {
        match self.document.get(LEVEL_NAME_KEY).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_LEVEL_NAME.to_string(),
        }
    }

    pub fn level_seed(&self) -> Option<&str> {
        self.document.get(LEVEL_SEED_KEY)
    }

    /// The `hardcore` flag as written in the file, if present.
    pub fn hardcore(&self) -> Option<bool> {
        self.document.get(HARDCORE_KEY).map(parse_bool)
    }

    pub fn set_level_name(&mut self, name: &InstanceName) {
        self.document.set(LEVEL_NAME_KEY, name.as_str());
    }

    pub fn set_level_seed(&mut self, seed: &str) {
        self.document.set(LEVEL_SEED_KEY, seed);
    }

    /// Text the config was loaded from; `None` when the file did not exist.
    pub fn original_text(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn render(&self) -> String {
        self.document.render()
    }
}

// =============================================================================
// ServerFiles
// =============================================================================

/// Paths and typed access to everything the orchestrator keeps in the server root.
#[derive(Debug, Clone)]
pub struct ServerFiles {
    root: PathBuf,
}

impl ServerFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn host_config_path(&self) -> PathBuf {
        self.root.join(HOST_CONFIG_FILE)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.root.join(MARKER_FILE)
    }

    pub fn base_name_path(&self) -> PathBuf {
        self.root.join(BASE_NAME_FILE)
    }

    pub fn world_start_path(&self) -> PathBuf {
        self.root.join(WORLD_START_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Directory of the named instance, only if the name is one plain path component.
    pub fn instance_dir(&self, name: &str) -> Option<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => Some(self.root.join(part)),
            _ => None,
        }
    }

    /// Backup root under the server root; nested relative folders are allowed,
    /// anything escaping the root is not.
    pub fn backup_root(&self, folder: &str) -> Option<PathBuf> {
        let path = Path::new(folder.trim());
        let mut saw_component = false;
        for component in path.components() {
            match component {
                Component::Normal(_) => saw_component = true,
                _ => return None,
            }
        }
        saw_component.then(|| self.root.join(path))
    }

    // -------------------------------------------------------------------------
    // Host config
    // -------------------------------------------------------------------------

    pub fn load_host_config(&self) -> Result<HostConfig, StoreError> {
        let text = read_optional(&self.host_config_path(), "read host config")?;
        Ok(HostConfig::from_text(text))
    }

    pub fn store_host_config(&self, config: &HostConfig) -> Result<(), StoreError> {
        write_atomic(&self.host_config_path(), config.render().as_bytes())
    }

    /// Put the host config back to the text it was loaded from.
    pub fn restore_host_config(&self, config: &HostConfig) -> Result<(), StoreError> {
        let path = self.host_config_path();
        match config.original_text() {
            Some(text) => write_atomic(&path, text.as_bytes()),
            None => match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::io("remove host config", &path, e)),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Rotation marker
    // -------------------------------------------------------------------------

    /// Only a regular file counts as a marker.
    pub fn marker_exists(&self) -> bool {
        self.marker_path().is_file()
    }

    pub fn write_marker(&self, marker: &RotationMarker) -> Result<(), StoreError> {
        let mut doc = PropertiesDocument::new();
        doc.push_comment("worldcycle rotation marker - consumed on next server start");
        doc.set(MARKER_REQUESTED_BY, &marker.requested_by);
        doc.set(MARKER_TIME, &marker.requested_at.timestamp_millis().to_string());
        doc.set(MARKER_OLD_NAME, &marker.old_level_name);
        doc.set(MARKER_NEW_NAME, marker.new_level_name.as_str());
        doc.set(MARKER_BASE_NAME, marker.base_level_name.as_str());
        if let Some(seed) = &marker.new_seed {
            doc.set(MARKER_NEW_SEED, seed);
        }
        write_atomic(&self.marker_path(), doc.render().as_bytes())
    }

    /// Read and fully validate the marker.
    pub fn read_marker(&self) -> Result<RotationMarker, StoreError> {
        let path = self.marker_path();
        let text = fs::read(&path)
            .map(decode_text)
            .map_err(|e| StoreError::io("read marker", &path, e))?;
        let doc = PropertiesDocument::parse(&text);

        let field = |key: &'static str| -> Result<String, StoreError> {
            doc.get(key)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| StoreError::malformed("marker", &path, format!("missing {}", key)))
        };

        let millis: i64 = field(MARKER_TIME)?
            .parse()
            .map_err(|e| StoreError::malformed("marker", &path, format!("bad time: {}", e)))?;
        let requested_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| StoreError::malformed("marker", &path, "time out of range"))?;
        let new_level_name = InstanceName::new(field(MARKER_NEW_NAME)?)
            .map_err(|e| StoreError::malformed("marker", &path, e))?;

        Ok(RotationMarker {
            requested_by: field(MARKER_REQUESTED_BY)?,
            requested_at,
            old_level_name: field(MARKER_OLD_NAME)?,
            new_level_name,
            base_level_name: BaseName::normalize(&field(MARKER_BASE_NAME)?),
            new_seed: doc
                .get(MARKER_NEW_SEED)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }

    /// Only the retired instance name; the other marker fields may be damaged.
    pub fn read_marker_retired_name(&self) -> Result<Option<String>, StoreError> {
        let path = self.marker_path();
        let text = fs::read(&path)
            .map(decode_text)
            .map_err(|e| StoreError::io("read marker", &path, e))?;
        Ok(PropertiesDocument::parse(&text)
            .get(MARKER_OLD_NAME)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string))
    }

    /// Remove the marker; a missing marker is not an error.
    pub fn remove_marker(&self) -> Result<(), StoreError> {
        let path = self.marker_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("remove marker", &path, e)),
        }
    }

    // -------------------------------------------------------------------------
    // Base-name sidecar
    // -------------------------------------------------------------------------

    pub fn read_base_name(&self) -> Result<Option<String>, StoreError> {
        let text = read_optional(&self.base_name_path(), "read base name")?;
        Ok(text
            .as_deref()
            .and_then(|t| t.lines().next())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string))
    }

    pub fn write_base_name(&self, base: &BaseName) -> Result<(), StoreError> {
        write_atomic(&self.base_name_path(), format!("{}\n", base).as_bytes())
    }

    // -------------------------------------------------------------------------
    // World-start sidecar
    // -------------------------------------------------------------------------

    /// `Ok(None)` when the sidecar is absent or does not hold a usable record.
    pub fn read_world_start(&self) -> Result<Option<WorldStartRecord>, StoreError> {
        let Some(text) = read_optional(&self.world_start_path(), "read world start")? else {
            return Ok(None);
        };
        let doc = PropertiesDocument::parse(&text);
        let level_name = doc.get(START_LEVEL_NAME).map(str::trim);
        let started_at = doc
            .get(START_TIME)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        Ok(match (level_name, started_at) {
            (Some(name), Some(at)) if !name.is_empty() => Some(WorldStartRecord::new(name, at)),
            _ => None,
        })
    }

    pub fn write_world_start(&self, record: &WorldStartRecord) -> Result<(), StoreError> {
        let mut doc = PropertiesDocument::new();
        doc.set(START_LEVEL_NAME, &record.level_name);
        doc.set(START_TIME, &record.started_at.timestamp_millis().to_string());
        write_atomic(&self.world_start_path(), doc.render().as_bytes())
    }
}
