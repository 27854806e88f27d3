//! Rotation settings value object
//!
//! Settings are resolved from string key/value pairs (the settings file plus
//! environment overrides) into a typed snapshot. Every key has a hard-coded
//! default, and a value that fails to parse falls back to that default.
//!
//! `RotationSettings` derives `Serialize` because the effective settings are
//! reported as JSON by the offline binary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::time_pattern::TimePattern;

// ============================================================================
// Keys
// ============================================================================

pub const CONFIRM_TIMEOUT_MS: &str = "confirm_timeout_ms";
pub const AUTO_RESTART: &str = "auto_restart";
pub const RESTART_DELAY_SECONDS: &str = "restart_delay_seconds";
pub const RESTART_COMMAND: &str = "restart_command";
pub const NEW_LEVEL_NAME_FORMAT: &str = "new_level_name_format";
pub const TIME_FORMAT: &str = "time_format";
pub const FORCE_NEW_SEED: &str = "force_new_seed";
pub const SEED_MODE: &str = "seed_mode";
pub const CUSTOM_SEED: &str = "custom_seed";
pub const BACKUP_OLD_WORLDS: &str = "backup_old_worlds";
pub const DELETE_INSTEAD_OF_BACKUP: &str = "delete_instead_of_backup";
pub const BACKUP_FOLDER_NAME: &str = "backup_folder_name";
pub const BACKUP_NAME_FORMAT: &str = "backup_name_format";

/// Longest accepted `confirm_timeout_ms` (one day); larger values use the default.
pub const MAX_CONFIRM_TIMEOUT_MS: u64 = 86_400_000;

/// Section a key is written under in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingSection {
    General,
    Restart,
    WorldRotation,
    Backups,
}

impl SettingSection {
    pub fn all() -> [SettingSection; 4] {
        [
            SettingSection::General,
            SettingSection::Restart,
            SettingSection::WorldRotation,
            SettingSection::Backups,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            SettingSection::General => "General",
            SettingSection::Restart => "Restart",
            SettingSection::WorldRotation => "World Rotation",
            SettingSection::Backups => "Backups",
        }
    }
}

/// A known setting: its key, default value, section and help text.
#[derive(Debug, Clone, Copy)]
pub struct SettingDefinition {
    pub key: &'static str,
    pub default: &'static str,
    pub section: SettingSection,
    pub help: &'static str,
}

/// Every known setting, in file order.
pub const SETTING_DEFINITIONS: &[SettingDefinition] = &[
    SettingDefinition {
        key: CONFIRM_TIMEOUT_MS,
        default: "30000",
        section: SettingSection::General,
        help: "How long a destructive command waits for its confirm, in milliseconds.",
    },
    SettingDefinition {
        key: AUTO_RESTART,
        default: "true",
        section: SettingSection::Restart,
        help: "If true, the server stops cleanly after a rotation is planned. A wrapper or panel is expected to start it again.",
    },
    SettingDefinition {
        key: RESTART_DELAY_SECONDS,
        default: "5",
        section: SettingSection::Restart,
        help: "Seconds between the rotation notice and the server stop.",
    },
    SettingDefinition {
        key: RESTART_COMMAND,
        default: "",
        section: SettingSection::Restart,
        help: "Informational only. Read by external wrappers, never executed here.",
    },
    SettingDefinition {
        key: NEW_LEVEL_NAME_FORMAT,
        default: "%name%_%time%",
        section: SettingSection::WorldRotation,
        help: "Name of the next world. Tokens: %name% (base name), %time% (time_format), %id% (short random id).",
    },
    SettingDefinition {
        key: TIME_FORMAT,
        default: super::time_pattern::DEFAULT_TIME_PATTERN,
        section: SettingSection::WorldRotation,
        help: "strftime pattern for %time%. Java-style patterns such as HH-mm-ss_uuuu-MM-dd are accepted too.",
    },
    SettingDefinition {
        key: FORCE_NEW_SEED,
        default: "true",
        section: SettingSection::WorldRotation,
        help: "If true, every rotation writes a new level-seed.",
    },
    SettingDefinition {
        key: SEED_MODE,
        default: "random",
        section: SettingSection::WorldRotation,
        help: "random or custom.",
    },
    SettingDefinition {
        key: CUSTOM_SEED,
        default: "",
        section: SettingSection::WorldRotation,
        help: "Seed used when seed_mode=custom. Blank means a random seed.",
    },
    SettingDefinition {
        key: BACKUP_OLD_WORLDS,
        default: "true",
        section: SettingSection::Backups,
        help: "If true, the retired world is moved into backup_folder_name.",
    },
    SettingDefinition {
        key: DELETE_INSTEAD_OF_BACKUP,
        default: "false",
        section: SettingSection::Backups,
        help: "If true, the retired world is deleted. Overrides backup_old_worlds.",
    },
    SettingDefinition {
        key: BACKUP_FOLDER_NAME,
        default: "Old Worlds",
        section: SettingSection::Backups,
        help: "Folder under the server root that receives retired worlds.",
    },
    SettingDefinition {
        key: BACKUP_NAME_FORMAT,
        default: "%name%_%ts%",
        section: SettingSection::Backups,
        help: "Backup folder name. Tokens: %name% (retired world), %ts% (yyyyMMdd-HHmmss), %id%.",
    },
];

/// Look up a known setting by key.
pub fn definition(key: &str) -> Option<&'static SettingDefinition> {
    SETTING_DEFINITIONS.iter().find(|d| d.key == key)
}

/// Default value for a known key.
pub fn default_value(key: &str) -> Option<&'static str> {
    definition(key).map(|d| d.default)
}

/// `true`, `1` and `yes` (any case) are true; everything else is false.
pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Parse an integer, returning `default` for anything unparseable.
pub fn parse_int(raw: &str, default: i64) -> i64 {
    raw.trim().parse().unwrap_or(default)
}

// ============================================================================
// Typed settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    #[default]
    Random,
    Custom,
}

impl SeedMode {
    /// `custom` (any case) selects `Custom`; anything else is `Random`.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("custom") {
            SeedMode::Custom
        } else {
            SeedMode::Random
        }
    }
}

/// What happens to `level-seed` on rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Keep whatever seed the host config has.
    Unchanged,
    /// Draw a fresh random seed. `blank_custom` is set when custom mode fell
    /// back because `custom_seed` was empty.
    Random { blank_custom: bool },
    /// Use the literal configured seed.
    Custom(String),
}

/// How the retired world directory is disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetirePolicy {
    Backup,
    Delete,
}

/// Effective orchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationSettings {
    pub confirm_timeout_ms: u64,

    // Restart
    pub auto_restart: bool,
    pub restart_delay_seconds: u64,
    pub restart_command: String,

    // World rotation
    pub new_level_name_format: String,
    pub time_format: TimePattern,
    pub force_new_seed: bool,
    pub seed_mode: SeedMode,
    pub custom_seed: String,

    // Backups
    pub backup_old_worlds: bool,
    pub delete_instead_of_backup: bool,
    pub backup_folder_name: String,
    pub backup_name_format: String,
}

impl RotationSettings {
    /// Resolve settings through `lookup`, falling back to defaults for
    /// missing, blank or malformed values.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = |key: &str| -> String {
            lookup(key)
                .or_else(|| default_value(key).map(str::to_string))
                .unwrap_or_default()
        };
        let non_blank = |key: &str| -> String {
            let value = raw(key);
            if value.trim().is_empty() {
                default_value(key).unwrap_or_default().to_string()
            } else {
                value
            }
        };
        let boolean = |key: &str| -> bool {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => parse_bool(&v),
                _ => default_value(key).map(parse_bool).unwrap_or(false),
            }
        };
        let non_negative = |key: &str| -> u64 {
            let fallback = default_value(key)
                .map(|d| parse_int(d, 0))
                .unwrap_or(0);
            let value = parse_int(&raw(key), fallback);
            u64::try_from(value)
                .or_else(|_| u64::try_from(fallback))
                .unwrap_or(0)
        };

        let confirm_timeout_ms = match non_negative(CONFIRM_TIMEOUT_MS) {
            ms if ms <= MAX_CONFIRM_TIMEOUT_MS => ms,
            _ => default_value(CONFIRM_TIMEOUT_MS)
                .map(|d| parse_int(d, 0))
                .and_then(|d| u64::try_from(d).ok())
                .unwrap_or(0),
        };

        Self {
            confirm_timeout_ms,
            auto_restart: boolean(AUTO_RESTART),
            restart_delay_seconds: non_negative(RESTART_DELAY_SECONDS),
            restart_command: raw(RESTART_COMMAND).trim().to_string(),
            new_level_name_format: non_blank(NEW_LEVEL_NAME_FORMAT),
            time_format: TimePattern::parse_or_default(&raw(TIME_FORMAT)),
            force_new_seed: boolean(FORCE_NEW_SEED),
            seed_mode: SeedMode::parse(&raw(SEED_MODE)),
            custom_seed: raw(CUSTOM_SEED).trim().to_string(),
            backup_old_worlds: boolean(BACKUP_OLD_WORLDS),
            delete_instead_of_backup: boolean(DELETE_INSTEAD_OF_BACKUP),
            backup_folder_name: non_blank(BACKUP_FOLDER_NAME).trim().to_string(),
            backup_name_format: non_blank(BACKUP_NAME_FORMAT),
        }
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        if !self.force_new_seed {
            return SeedPolicy::Unchanged;
        }
        match self.seed_mode {
            SeedMode::Random => SeedPolicy::Random {
                blank_custom: false,
            },
            SeedMode::Custom if self.custom_seed.is_empty() => SeedPolicy::Random {
                blank_custom: true,
            },
            SeedMode::Custom => SeedPolicy::Custom(self.custom_seed.clone()),
        }
    }

    /// Backup only when enabled and not overridden by `delete_instead_of_backup`.
    pub fn retire_policy(&self) -> RetirePolicy {
        if self.backup_old_worlds && !self.delete_instead_of_backup {
            RetirePolicy::Backup
        } else {
            RetirePolicy::Delete
        }
    }

    pub fn confirm_timeout(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.confirm_timeout_ms).unwrap_or(i64::MAX))
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_seconds)
    }
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self::resolve(|_| None)
    }
}
