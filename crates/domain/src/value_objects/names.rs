//! Validated name newtypes for world instances
//!
//! These newtypes ensure that names are valid by construction:
//! - `InstanceName` is always safe to use as a single directory name
//! - `BaseName` never carries a rotation-time suffix

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Level name assumed when the host configuration does not name one.
pub const DEFAULT_LEVEL_NAME: &str = "world";

/// Characters rejected by at least one of the common desktop filesystems.
const ILLEGAL_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Length of the disambiguator produced by [`short_id`].
const SHORT_ID_LEN: usize = 8;

/// One or more `_HH-mm-ss_yyyy-MM-dd` groups anchored at the end of a name.
static TIME_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:_\d{2}-\d{2}-\d{2}_\d{4}-\d{2}-\d{2})+$").expect("valid regex")
});

// ============================================================================
// InstanceName
// ============================================================================

/// A sanitized world-instance directory name (never empty, no illegal characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceName(String);

impl InstanceName {
    /// Sanitize arbitrary text into a directory-safe instance name.
    ///
    /// Illegal characters become `-`, surrounding whitespace is trimmed and
    /// trailing spaces/periods are dropped. When nothing survives, the name
    /// falls back to `world_<epoch millis of now>`.
    pub fn sanitize(raw: &str, now: DateTime<Utc>) -> Self {
        let replaced: String = raw
            .chars()
            .map(|c| if ILLEGAL_CHARS.contains(&c) { '-' } else { c })
            .collect();
        let tidy = replaced.trim().trim_end_matches([' ', '.']);
        if tidy.is_empty() {
            Self(format!("{}_{}", DEFAULT_LEVEL_NAME, now.timestamp_millis()))
        } else {
            Self(tidy.to_string())
        }
    }

    /// Accept a name that is already in sanitized form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is empty, contains an
    /// illegal character, or ends with a space or period.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("Instance name cannot be empty"));
        }
        if let Some(c) = name.chars().find(|c| ILLEGAL_CHARS.contains(c)) {
            return Err(DomainError::validation(format!(
                "Instance name cannot contain '{}'",
                c
            )));
        }
        if name.ends_with([' ', '.']) || name.trim() != name {
            return Err(DomainError::validation(
                "Instance name cannot start or end with whitespace or end with a period",
            ));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for InstanceName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<InstanceName> for String {
    fn from(name: InstanceName) -> String {
        name.0
    }
}

// ============================================================================
// BaseName
// ============================================================================

/// The stable root name substituted for `%name%` on every rotation.
///
/// Always a fixed point of [`strip_time_suffixes`], so rotating a rotated
/// world never grows its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BaseName(String);

impl BaseName {
    /// Normalize a persisted or current level name into a base name.
    pub fn normalize(raw: &str) -> Self {
        let stripped = strip_time_suffixes(raw.trim());
        if stripped.is_empty() {
            Self(DEFAULT_LEVEL_NAME.to_string())
        } else {
            Self(stripped)
        }
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BaseName {
    fn from(s: String) -> Self {
        Self::normalize(&s)
    }
}

impl From<BaseName> for String {
    fn from(name: BaseName) -> String {
        name.0
    }
}

// ============================================================================
// Name helpers
// ============================================================================

/// Remove every trailing rotation-time suffix and any trailing underscores.
///
/// Repeats until the name stops changing, so the result is idempotent:
/// `strip_time_suffixes(strip_time_suffixes(x)) == strip_time_suffixes(x)`.
pub fn strip_time_suffixes(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let without_suffix = TIME_SUFFIX_RE.replace(&current, "");
        let next = without_suffix.trim_end_matches('_');
        if next == current {
            return current;
        }
        current = next.to_string();
    }
}

/// Values substituted into a name template.
#[derive(Debug, Clone, Copy)]
pub struct NameTokens<'a> {
    /// `%name%`
    pub name: &'a str,
    /// `%time%` and `%ts%`
    pub time: &'a str,
    /// `%id%`
    pub id: &'a str,
}

/// Substitute `%name%`, `%time%`/`%ts%` and `%id%` in a single left-to-right pass.
///
/// Substituted values are never rescanned, and unknown `%...%` sequences are
/// copied through unchanged.
pub fn render(template: &str, tokens: &NameTokens<'_>) -> String {
    let replacements = [
        ("%name%", tokens.name),
        ("%time%", tokens.time),
        ("%ts%", tokens.time),
        ("%id%", tokens.id),
    ];

    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match replacements
            .iter()
            .find(|(token, _)| tail.starts_with(token))
        {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Short opaque disambiguator for names created within the same second.
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..SHORT_ID_LEN].to_string()
}
