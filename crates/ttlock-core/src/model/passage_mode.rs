// ── Passage mode schedule ──

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use ttlock_api::models::{PassageModeParams, PassageModeRaw};

use crate::error::CoreError;

/// Minutes in a day; valid minute-of-day values are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Tri-state switch used by the vendor: 0=unknown, 1=on, 2=off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnOff {
    #[default]
    Unknown,
    On,
    Off,
}

impl OnOff {
    pub fn from_raw(value: i64) -> Self {
        match value {
            1 => Self::On,
            2 => Self::Off,
            _ => Self::Unknown,
        }
    }

    /// Only an explicit "on" counts; unknown is falsy.
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Recurring window during which the lock stays open and auto-lock is
/// suppressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageModeConfig {
    pub enabled: bool,
    pub auto_unlock: bool,
    pub all_day: bool,
    /// Minute of day the window opens (inclusive).
    pub start_minute: u16,
    /// Minute of day the window closes (exclusive).
    pub end_minute: u16,
    /// 1=Monday .. 7=Sunday
    pub week_days: BTreeSet<u8>,
}

impl PassageModeConfig {
    /// Whether the window is open at `at`, evaluated in `at`'s own offset.
    ///
    /// The interval is half-open: a window ending at 720 is active at 719
    /// but not at 720. `all_day` ignores the minutes entirely.
    pub fn is_active_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        if !self.enabled {
            return false;
        }

        let Ok(weekday) = u8::try_from(at.weekday().number_from_monday()) else {
            return false;
        };
        if !self.week_days.contains(&weekday) {
            return false;
        }

        if self.all_day {
            return true;
        }

        let minute = at.hour() * 60 + at.minute();
        u32::from(self.start_minute) <= minute && minute < u32::from(self.end_minute)
    }

    /// Reject values the lock would not accept.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.start_minute >= MINUTES_PER_DAY || self.end_minute >= MINUTES_PER_DAY {
            return Err(CoreError::Validation {
                message: format!(
                    "passage mode minutes must be below {MINUTES_PER_DAY} (got {}..{})",
                    self.start_minute, self.end_minute
                ),
            });
        }
        if let Some(day) = self.week_days.iter().find(|d| !(1..=7).contains(*d)) {
            return Err(CoreError::Validation {
                message: format!("week day {day} is outside 1 (Monday)..7 (Sunday)"),
            });
        }
        Ok(())
    }

    /// Wire parameters for `lock/configPassageMode`.
    pub fn to_params(&self) -> PassageModeParams {
        PassageModeParams {
            enabled: self.enabled,
            auto_unlock: self.auto_unlock,
            all_day: self.all_day,
            start_minute: self.start_minute,
            end_minute: self.end_minute,
            week_days: self.week_days.iter().copied().collect(),
        }
    }
}

impl From<PassageModeRaw> for PassageModeConfig {
    fn from(raw: PassageModeRaw) -> Self {
        Self {
            enabled: OnOff::from_raw(raw.passage_mode).is_on(),
            auto_unlock: OnOff::from_raw(raw.auto_unlock).is_on(),
            all_day: OnOff::from_raw(raw.is_all_day).is_on(),
            start_minute: minute_or_zero(raw.start_date),
            end_minute: minute_or_zero(raw.end_date),
            week_days: raw.week_days.into_iter().collect(),
        }
    }
}

/// Null, negative, or overflowing minutes collapse to 0.
fn minute_or_zero(value: Option<i64>) -> u16 {
    value.and_then(|v| u16::try_from(v).ok()).unwrap_or(0)
}

/// Absent config is never active.
pub fn passage_mode_active<Tz: TimeZone>(
    config: Option<&PassageModeConfig>,
    at: &DateTime<Tz>,
) -> bool {
    config.is_some_and(|c| c.is_active_at(at))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn six_to_six_every_day() -> PassageModeConfig {
        PassageModeConfig::from(PassageModeRaw {
            passage_mode: 1,
            start_date: Some(360),
            end_date: Some(1080),
            is_all_day: 2,
            week_days: vec![1, 2, 3, 4, 5, 6, 7],
            auto_unlock: 2,
        })
    }

    fn all_day_weekdays() -> PassageModeConfig {
        PassageModeConfig::from(PassageModeRaw {
            passage_mode: 1,
            start_date: None,
            end_date: None,
            is_all_day: 1,
            week_days: vec![1, 2, 3, 4, 5],
            auto_unlock: 1,
        })
    }

    /// 2023-04-17 is a Monday.
    fn at(day_offset: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2023, 4, 17 + day_offset)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
            .and_utc()
    }

    const MON: u32 = 0;
    const TUE: u32 = 1;
    const WED: u32 = 2;
    const THU: u32 = 3;
    const FRI: u32 = 4;
    const SAT: u32 = 5;
    const SUN: u32 = 6;

    #[test]
    fn six_to_six_window() {
        let config = six_to_six_every_day();
        assert!(config.is_active_at(&at(SUN, 6, 0)));
        assert!(config.is_active_at(&at(WED, 10, 0)));
        assert!(config.is_active_at(&at(FRI, 17, 59)));
        assert!(!config.is_active_at(&at(MON, 0, 0)));
        assert!(!config.is_active_at(&at(TUE, 5, 59)));
        assert!(!config.is_active_at(&at(THU, 18, 0)));
        assert!(!config.is_active_at(&at(SUN, 23, 59)));
    }

    #[test]
    fn all_day_on_weekdays_only() {
        let config = all_day_weekdays();
        for day in [MON, TUE, WED, THU, FRI] {
            assert!(config.is_active_at(&at(day, 0, 0)));
            assert!(config.is_active_at(&at(day, 23, 59)));
        }
        for day in [SAT, SUN] {
            assert!(!config.is_active_at(&at(day, 12, 0)));
        }
    }

    #[test]
    fn null_minutes_normalize_to_zero() {
        let config = all_day_weekdays();
        assert_eq!(config.start_minute, 0);
        assert_eq!(config.end_minute, 0);
    }

    #[test]
    fn disabled_or_absent_is_never_active() {
        let mut config = six_to_six_every_day();
        config.enabled = false;
        assert!(!config.is_active_at(&at(WED, 10, 0)));
        assert!(!passage_mode_active(None, &at(WED, 10, 0)));
    }

    #[test]
    fn unknown_switch_is_falsy() {
        let config = PassageModeConfig::from(PassageModeRaw {
            passage_mode: 0,
            week_days: vec![1, 2, 3, 4, 5, 6, 7],
            is_all_day: 1,
            ..PassageModeRaw::default()
        });
        assert!(!config.enabled);
        assert!(!config.is_active_at(&at(WED, 10, 0)));
    }

    #[test]
    fn validation_rejects_out_of_range() {
        let mut config = six_to_six_every_day();
        assert!(config.validate().is_ok());
        config.end_minute = MINUTES_PER_DAY;
        assert!(config.validate().is_err());
        config.end_minute = 1080;
        config.week_days.insert(8);
        assert!(config.validate().is_err());
    }

    #[test]
    fn params_roundtrip_switches() {
        let params = six_to_six_every_day().to_params();
        assert!(params.enabled);
        assert!(!params.auto_unlock);
        assert!(!params.all_day);
        assert_eq!(params.week_days, vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
