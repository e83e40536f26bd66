//! Counter reset lifecycle: daily and weekly calendar boundaries.
//!
//! Resets are evaluated lazily whenever the store is queried.  A window
//! resets when the calendar date (in the configured timezone) of `now` is
//! strictly after the date of the window's last reset.  The weekly window
//! additionally requires `now` to fall on the week-start weekday, so a week
//! in which the store is never touched on that weekday carries over into
//! the next one.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use tg_domain::config::QuotaConfig;

/// The two accumulation windows a counter can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Daily,
    Weekly,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => f.write_str("daily"),
            Self::Weekly => f.write_str("weekly"),
        }
    }
}

/// Timezone and week start used to decide when windows roll over.
#[derive(Debug, Clone, Copy)]
pub struct ResetCalendar {
    pub tz: Tz,
    pub week_start: Weekday,
}

impl Default for ResetCalendar {
    fn default() -> Self {
        Self {
            tz: chrono_tz::UTC,
            week_start: Weekday::Mon,
        }
    }
}

impl From<&QuotaConfig> for ResetCalendar {
    fn from(config: &QuotaConfig) -> Self {
        Self {
            tz: config.tz(),
            week_start: config.week_start,
        }
    }
}

impl ResetCalendar {
    /// Calendar date of `ts` in this calendar's timezone.
    pub fn date_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }

    /// Whether a daily reset is due given the last one happened at `last_reset`.
    pub fn crossed_day(&self, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.date_of(now) > self.date_of(last_reset)
    }

    /// Whether a weekly reset is due: a date change that lands on the
    /// week-start weekday.
    pub fn crossed_week(&self, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.crossed_day(last_reset, now) && self.date_of(now).weekday() == self.week_start
    }

    pub fn is_due(&self, window: Window, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match window {
            Window::Daily => self.crossed_day(last_reset, now),
            Window::Weekly => self.crossed_week(last_reset, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        // March 2026: the 2nd and the 9th are Mondays.
        Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
    }

    #[test]
    fn same_date_is_not_a_new_day() {
        let cal = ResetCalendar::default();
        assert!(!cal.crossed_day(utc(3, 0, 1), utc(3, 23, 59)));
    }

    #[test]
    fn next_date_is_a_new_day() {
        let cal = ResetCalendar::default();
        assert!(cal.crossed_day(utc(3, 23, 59), utc(4, 0, 0)));
    }

    #[test]
    fn clock_going_backwards_never_resets() {
        let cal = ResetCalendar::default();
        assert!(!cal.crossed_day(utc(5, 12, 0), utc(4, 12, 0)));
    }

    #[test]
    fn dates_follow_the_configured_timezone() {
        let cal = ResetCalendar {
            tz: chrono_tz::Europe::Paris,
            week_start: Weekday::Mon,
        };
        // 23:30 UTC on the 3rd is already the 4th in Paris.
        assert!(cal.crossed_day(utc(3, 12, 0), utc(3, 23, 30)));
        assert!(!ResetCalendar::default().crossed_day(utc(3, 12, 0), utc(3, 23, 30)));
    }

    #[test]
    fn week_rolls_over_only_on_week_start() {
        let cal = ResetCalendar::default();
        // Tuesday to Sunday: days changed, no Monday.
        assert!(!cal.crossed_week(utc(3, 9, 0), utc(8, 9, 0)));
        // Landing on Monday the 9th.
        assert!(cal.crossed_week(utc(3, 9, 0), utc(9, 9, 0)));
        // Tuesday the 10th after skipping Monday: deferred.
        assert!(!cal.crossed_week(utc(3, 9, 0), utc(10, 9, 0)));
    }

    #[test]
    fn second_check_on_week_start_is_not_due() {
        let cal = ResetCalendar::default();
        assert!(!cal.crossed_week(utc(9, 0, 5), utc(9, 18, 0)));
    }

    #[test]
    fn custom_week_start() {
        let cal = ResetCalendar {
            tz: chrono_tz::UTC,
            week_start: Weekday::Sun,
        };
        assert!(cal.is_due(Window::Weekly, utc(3, 9, 0), utc(8, 9, 0)));
        assert!(!cal.is_due(Window::Weekly, utc(3, 9, 0), utc(9, 9, 0)));
    }
}
