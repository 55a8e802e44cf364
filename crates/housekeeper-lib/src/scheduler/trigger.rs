//! Scheduler triggers - rules that determine a job's next due instant
//!
//! Supports three trigger types:
//! - Daily: once per day at a fixed UTC time of day
//! - Weekly: every seven days from the last run
//! - Interval: repeating at a fixed, strictly positive period

use crate::error::{HousekeeperError, Result};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Accepted time-of-day formats for daily triggers
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S"];

/// Upper bound for configured intervals (about ten years)
const MAX_INTERVAL_SECS: u64 = 10 * 366 * 24 * 60 * 60;

/// Trigger rule for a scheduled job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Every day at `at` (UTC)
    Daily { at: NaiveTime },
    /// Every seven days
    Weekly,
    /// Every `every`, measured from the previous run
    Interval { every: Duration },
}

impl Trigger {
    /// Create a daily trigger at `hour:minute`
    pub fn daily(hour: u32, minute: u32) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            HousekeeperError::Config(format!("invalid time of day {:02}:{:02}", hour, minute))
        })?;
        Ok(Self::Daily { at })
    }

    /// Create an interval trigger
    pub fn every(every: Duration) -> Self {
        Self::Interval { every }
    }

    pub fn every_minutes(minutes: i64) -> Self {
        Self::every(Duration::minutes(minutes))
    }

    pub fn every_hours(hours: i64) -> Self {
        Self::every(Duration::hours(hours))
    }

    /// Check the trigger invariants for the job named `job`
    pub fn validate(&self, job: &str) -> Result<()> {
        match self {
            Trigger::Interval { every } if *every <= Duration::zero() => {
                Err(HousekeeperError::InvalidTrigger {
                    job: job.to_string(),
                    reason: format!("interval must be positive, got {}s", every.num_seconds()),
                })
            }
            _ => Ok(()),
        }
    }

    /// Compute the next due instant strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Trigger::Daily { at } => {
                let today = Utc.from_utc_datetime(&now.date_naive().and_time(*at));
                if today > now {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Trigger::Weekly => now + Duration::weeks(1),
            Trigger::Interval { every } => now + *every,
        }
    }

    /// Short human-readable description, e.g. `daily at 09:00`
    pub fn describe(&self) -> String {
        match self {
            Trigger::Daily { at } => format!("daily at {}", at.format("%H:%M")),
            Trigger::Weekly => "weekly".to_string(),
            Trigger::Interval { every } => {
                let secs = every.num_seconds();
                if secs % 3600 == 0 {
                    format!("every {}h", secs / 3600)
                } else if secs % 60 == 0 {
                    format!("every {}m", secs / 60)
                } else {
                    format!("every {}s", secs)
                }
            }
        }
    }
}

/// Serialized trigger form used in configuration files
///
/// ```toml
/// trigger = { type = "daily", at = "09:00" }
/// trigger = { type = "weekly" }
/// trigger = { type = "interval", every_secs = 1800 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    Daily { at: String },
    Weekly,
    Interval { every_secs: u64 },
}

impl TriggerConfig {
    pub fn daily(at: impl Into<String>) -> Self {
        Self::Daily { at: at.into() }
    }

    pub fn interval_minutes(minutes: u64) -> Self {
        Self::Interval {
            every_secs: minutes * 60,
        }
    }

    /// Parse into a validated [`Trigger`] for the job named `job`
    pub fn to_trigger(&self, job: &str) -> Result<Trigger> {
        let trigger = match self {
            TriggerConfig::Daily { at } => {
                let at = parse_time_of_day(at).ok_or_else(|| HousekeeperError::InvalidTrigger {
                    job: job.to_string(),
                    reason: format!("'{}' is not a valid HH:MM time", at),
                })?;
                Trigger::Daily { at }
            }
            TriggerConfig::Weekly => Trigger::Weekly,
            TriggerConfig::Interval { every_secs } => {
                if *every_secs > MAX_INTERVAL_SECS {
                    return Err(HousekeeperError::InvalidTrigger {
                        job: job.to_string(),
                        reason: format!("interval of {}s is too large", every_secs),
                    });
                }
                Trigger::Interval {
                    every: Duration::seconds(*every_secs as i64),
                }
            }
        };

        trigger.validate(job)?;
        Ok(trigger)
    }
}

fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value.trim(), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_daily_before_time_is_same_day() {
        let trigger = Trigger::daily(9, 0).unwrap();
        assert_eq!(trigger.next_after(at(8, 0)), at(9, 0));
    }

    #[test]
    fn test_daily_after_time_is_next_day() {
        let trigger = Trigger::daily(9, 0).unwrap();
        let next = trigger.next_after(at(9, 30));

        assert_eq!(next, at(9, 0) + Duration::days(1));
    }

    #[test]
    fn test_daily_exactly_at_time_is_next_day() {
        let trigger = Trigger::daily(9, 0).unwrap();
        assert_eq!(trigger.next_after(at(9, 0)), at(9, 0) + Duration::days(1));
    }

    #[test]
    fn test_daily_rejects_invalid_clock_value() {
        assert!(Trigger::daily(24, 0).is_err());
        assert!(Trigger::daily(9, 60).is_err());
    }

    #[test]
    fn test_weekly_is_seven_days() {
        assert_eq!(Trigger::Weekly.next_after(at(10, 0)), at(10, 0) + Duration::days(7));
    }

    #[test]
    fn test_interval_adds_period() {
        let trigger = Trigger::every_minutes(30);
        assert_eq!(trigger.next_after(at(10, 0)), at(10, 30));
    }

    #[test]
    fn test_interval_must_be_positive() {
        assert!(Trigger::every(Duration::zero()).validate("job").is_err());
        assert!(Trigger::every(Duration::seconds(-5)).validate("job").is_err());
        assert!(Trigger::every(Duration::seconds(1)).validate("job").is_ok());
    }

    #[test]
    fn test_trigger_config_parsing() {
        let daily = TriggerConfig::daily("20:00").to_trigger("cleanup").unwrap();
        assert_eq!(daily, Trigger::daily(20, 0).unwrap());

        let with_seconds = TriggerConfig::daily("07:15:00").to_trigger("x").unwrap();
        assert_eq!(with_seconds, Trigger::daily(7, 15).unwrap());

        let interval = TriggerConfig::interval_minutes(30).to_trigger("report").unwrap();
        assert_eq!(interval, Trigger::every_minutes(30));
    }

    #[test]
    fn test_trigger_config_rejects_bad_values() {
        let err = TriggerConfig::daily("25:00").to_trigger("backup").unwrap_err();
        assert!(matches!(err, HousekeeperError::InvalidTrigger { .. }));

        let err = TriggerConfig::Interval { every_secs: 0 }
            .to_trigger("report")
            .unwrap_err();
        assert!(err.to_string().contains("report"));
    }

    #[test]
    fn test_trigger_config_deserializes_tagged() {
        let parsed: TriggerConfig =
            serde_json::from_str(r#"{"type":"interval","every_secs":60}"#).unwrap();
        assert_eq!(parsed, TriggerConfig::Interval { every_secs: 60 });

        let weekly: TriggerConfig = serde_json::from_str(r#"{"type":"weekly"}"#).unwrap();
        assert_eq!(weekly, TriggerConfig::Weekly);
    }

    #[test]
    fn test_describe() {
        assert_eq!(Trigger::daily(9, 0).unwrap().describe(), "daily at 09:00");
        assert_eq!(Trigger::every_minutes(30).describe(), "every 30m");
        assert_eq!(Trigger::every_hours(1).describe(), "every 1h");
        assert_eq!(Trigger::Weekly.describe(), "weekly");
    }
}
