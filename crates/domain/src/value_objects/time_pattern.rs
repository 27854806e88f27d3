//! Timestamp patterns used when naming rotated and backed-up worlds.
//!
//! Patterns are stored as chrono strftime strings. Operators coming from the
//! Java ecosystem often write `HH-mm-ss_uuuu-MM-dd`; those are translated on
//! parse so both spellings keep working.

use std::fmt;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Default `time_format`, yields e.g. `14-02-31_2025-10-22`.
pub const DEFAULT_TIME_PATTERN: &str = "%H-%M-%S_%Y-%m-%d";

/// Fixed timestamp substituted for `%ts%` in backup names.
pub const BACKUP_TIMESTAMP_PATTERN: &str = "%Y%m%d-%H%M%S";

/// A validated strftime pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimePattern(String);

impl TimePattern {
    /// Parse a strftime pattern, or translate a Java `DateTimeFormatter` pattern.
    ///
    /// Anything containing `%` is treated as strftime.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::parse("time pattern cannot be empty"));
        }

        let strftime = if raw.contains('%') {
            raw.to_string()
        } else {
            translate_java(raw)?
        };

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(DomainError::parse(format!(
                "invalid time pattern '{}'",
                raw
            )));
        }
        Ok(Self(strftime))
    }

    /// Parse, falling back to [`TimePattern::default`] when the pattern is malformed.
    pub fn parse_or_default(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    /// Pattern used for the backup `%ts%` token.
    pub fn backup_timestamp() -> Self {
        Self(BACKUP_TIMESTAMP_PATTERN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render `at` in the timezone it carries.
    pub fn format<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        at.format(&self.0).to_string()
    }
}

impl Default for TimePattern {
    fn default() -> Self {
        Self(DEFAULT_TIME_PATTERN.to_string())
    }
}

impl fmt::Display for TimePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TimePattern {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TimePattern> for String {
    fn from(p: TimePattern) -> String {
        p.0
    }
}

fn translate_java(pattern: &str) -> Result<String, DomainError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is an escaped quote, 'text' is a literal run
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => {
                        return Err(DomainError::parse(format!(
                            "unterminated quote in time pattern '{}'",
                            pattern
                        )))
                    }
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        out.push('\'');
                        j += 2;
                    }
                    Some('\'') => {
                        j += 1;
                        break;
                    }
                    Some('%') => {
                        out.push_str("%%");
                        j += 1;
                    }
                    Some(&literal) => {
                        out.push(literal);
                        j += 1;
                    }
                }
            }
            i = j;
            continue;
        }

        if c.is_ascii_alphabetic() {
            let width = chars[i..].iter().take_while(|&&x| x == c).count();
            out.push_str(java_field(c, width)?);
            i += width;
            continue;
        }

        out.push(c);
        i += 1;
    }

    Ok(out)
}

fn java_field(letter: char, width: usize) -> Result<&'static str, DomainError> {
    let spec = match (letter, width) {
        ('y' | 'u', 2) => "%y",
        ('y' | 'u', _) => "%Y",
        ('M', 1) => "%-m",
        ('M', 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('d', 1) => "%-d",
        ('d', _) => "%d",
        ('H', 1) => "%-H",
        ('H', _) => "%H",
        ('h', 1) => "%-I",
        ('h', _) => "%I",
        ('m', 1) => "%-M",
        ('m', _) => "%M",
        ('s', 1) => "%-S",
        ('s', _) => "%S",
        ('S', 1..=3) => "%3f",
        ('a', _) => "%p",
        ('E', 1..=3) => "%a",
        ('E', _) => "%A",
        _ => {
            return Err(DomainError::parse(format!(
                "unsupported pattern letter '{}'",
                letter
            )))
        }
    };
    Ok(spec)
}
