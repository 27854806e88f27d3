//! Orchestrator settings backed by `worldcycle.properties`.
//!
//! Load order on every `reload`: hard-coded defaults, then the settings file,
//! then `WORLDCYCLE_<KEY>` environment overrides. After merging defaults and
//! the file, the file is rewritten in a sectioned, commented layout so new
//! keys show up for operators. Environment overrides are never written back.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use worldcycle_domain::value_objects::settings::{
    definition, parse_bool, parse_int, SettingSection, SETTING_DEFINITIONS,
};
use worldcycle_domain::RotationSettings;

use super::properties::{decode_text, PropertiesDocument};
use super::server_files::write_atomic;

/// Prefix for environment overrides, e.g. `WORLDCYCLE_RESTART_DELAY_SECONDS`.
pub const ENV_PREFIX: &str = "WORLDCYCLE_";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct ConfigStore {
    path: Option<PathBuf>,
    env: EnvLookup,
    values: RwLock<HashMap<String, String>>,
}

impl ConfigStore {
    /// Settings file at `path`, with overrides from the process environment.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_env(Some(path.into()), |name| std::env::var(name).ok())
    }

    /// Defaults only: no file, no environment.
    pub fn detached() -> Self {
        Self::with_env(None, |_| None)
    }

    pub fn with_env<F>(path: Option<PathBuf>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let store = Self {
            path,
            env: Box::new(env),
            values: RwLock::new(HashMap::new()),
        };
        store.reload();
        store
    }

    /// Re-read defaults, the settings file and the environment.
    ///
    /// Never fails: unreadable files leave the defaults in place and a failed
    /// rewrite is only logged.
    pub fn reload(&self) {
        let mut values: HashMap<String, String> = SETTING_DEFINITIONS
            .iter()
            .map(|d| (d.key.to_string(), d.default.to_string()))
            .collect();

        if let Some(path) = &self.path {
            let existing = match fs::read(path) {
                Ok(bytes) => Some(decode_text(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not read settings, using defaults");
                    self.replace(self.apply_env(values));
                    return;
                }
            };

            if let Some(text) = &existing {
                for (key, value) in PropertiesDocument::parse(text).entries() {
                    let key = key.trim();
                    if !key.is_empty() {
                        values.insert(key.to_string(), value.to_string());
                    }
                }
            }

            let formatted = render_settings(&values);
            if existing.as_deref() != Some(formatted.as_str()) {
                match write_atomic(path, formatted.as_bytes()) {
                    Ok(()) => tracing::info!(path = %path.display(), "Wrote settings file"),
                    Err(e) => tracing::warn!(error = %e, "Could not write settings file"),
                }
            }
        }

        self.replace(self.apply_env(values));
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read_values().get(key).cloned()
    }

    /// `true|1|yes` (any case); absent keys are false.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).as_deref().map(parse_bool).unwrap_or(false)
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .map(|v| parse_int(&v, default))
            .unwrap_or(default)
    }

    /// Typed snapshot of the current values.
    pub fn settings(&self) -> RotationSettings {
        let values = self.read_values();
        RotationSettings::resolve(|key| values.get(key).cloned())
    }

    /// Raw key/value pairs, sorted by key.
    pub fn raw_values(&self) -> BTreeMap<String, String> {
        self.read_values()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn apply_env(&self, mut values: HashMap<String, String>) -> HashMap<String, String> {
        for def in SETTING_DEFINITIONS {
            let name = format!("{}{}", ENV_PREFIX, def.key.to_ascii_uppercase());
            if let Some(value) = (self.env)(&name) {
                tracing::debug!(key = def.key, env = %name, "Setting overridden from environment");
                values.insert(def.key.to_string(), value);
            }
        }
        values
    }

    fn replace(&self, values: HashMap<String, String>) {
        let mut guard = self
            .values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = values;
    }

    fn read_values(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Sectioned layout with help comments; unknown keys go to a trailing section.
fn render_settings(values: &HashMap<String, String>) -> String {
    let mut doc = PropertiesDocument::new();
    doc.push_comment("worldcycle settings");
    doc.push_comment("This file is rewritten on load. Unknown keys are kept under \"Other (preserved)\".");

    for section in SettingSection::all() {
        doc.push_blank();
        doc.push_comment(&format!("==== {} ====", section.title()));
        for def in SETTING_DEFINITIONS.iter().filter(|d| d.section == section) {
            doc.push_comment(def.help);
            let value = values.get(def.key).map(String::as_str).unwrap_or(def.default);
            doc.set(def.key, value);
        }
    }

    let mut unknown: Vec<(&String, &String)> = values
        .iter()
        .filter(|(key, _)| definition(key).is_none())
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        doc.push_blank();
        doc.push_comment("==== Other (preserved) ====");
        for (key, value) in unknown {
            doc.set(key, value);
        }
    }

    doc.render()
}
