use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// When the currently loaded world instance was first started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldStartRecord {
    pub level_name: String,
    pub started_at: DateTime<Utc>,
}

impl WorldStartRecord {
    pub fn new(level_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            level_name: level_name.into(),
            started_at,
        }
    }

    /// Keep the previous start only if it belongs to the active instance.
    ///
    /// A restart of the same world continues its clock; a freshly rotated
    /// world starts at `now`.
    pub fn restore_or_start(
        previous: Option<WorldStartRecord>,
        active_level_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        match previous {
            Some(record) if record.level_name == active_level_name => record,
            _ => Self::new(active_level_name, now),
        }
    }

    /// Elapsed time since start, never negative.
    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }
}

/// Format as `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn same_instance_keeps_its_start() {
        let previous = WorldStartRecord::new("world", at(1_000));
        let record = WorldStartRecord::restore_or_start(Some(previous.clone()), "world", at(5_000));
        assert_eq!(record, previous);
        assert_eq!(record.uptime(at(5_000)), Duration::seconds(4_000));
    }

    #[test]
    fn different_instance_starts_now() {
        let previous = WorldStartRecord::new("world", at(1_000));
        let record = WorldStartRecord::restore_or_start(
            Some(previous),
            "world_14-02-31_2025-10-22",
            at(5_000),
        );
        assert_eq!(record.level_name, "world_14-02-31_2025-10-22");
        assert_eq!(record.started_at, at(5_000));
    }

    #[test]
    fn missing_record_starts_now() {
        let record = WorldStartRecord::restore_or_start(None, "world", at(42));
        assert_eq!(record.started_at, at(42));
    }

    #[test]
    fn uptime_never_negative() {
        let record = WorldStartRecord::new("world", at(100));
        assert_eq!(record.uptime(at(50)), Duration::zero());
    }

    #[test]
    fn format_uptime_pads_and_overflows_hours() {
        assert_eq!(format_uptime(Duration::seconds(0)), "00:00:00");
        assert_eq!(format_uptime(Duration::seconds(59)), "00:00:59");
        assert_eq!(format_uptime(Duration::seconds(3600 * 100 + 61)), "100:01:01");
        assert_eq!(format_uptime(Duration::seconds(-5)), "00:00:00");
    }
}
