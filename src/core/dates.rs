//! Calendar-day utilities anchored to an injectable "today".
//!
//! Everything here works at day granularity: time-of-day and offsets beyond
//! the local calendar day are discarded.

use chrono::{Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// ISO calendar date format used across the journal (`YYYY-MM-DD`).
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current calendar day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock day in the local timezone, or in a fixed IANA timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    tz: Option<Tz>,
}

impl SystemClock {
    pub fn local() -> Self {
        Self { tz: None }
    }

    pub fn in_timezone(tz: Tz) -> Self {
        Self { tz: Some(tz) }
    }

    /// Parse an IANA timezone name such as `Asia/Almaty`.
    pub fn from_name(name: &str) -> Result<Self, String> {
        name.trim()
            .parse::<Tz>()
            .map(Self::in_timezone)
            .map_err(|e| format!("invalid timezone `{name}`: {e}"))
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        match self.tz {
            Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
            None => Local::now().date_naive(),
        }
    }
}

/// A clock pinned to one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Format a date as zero-padded `YYYY-MM-DD`.
pub fn to_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date, ignoring anything after the date part
/// (e.g. a `T00:00:00` suffix).
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, ISO_DATE_FORMAT)
}

/// The `n` most recent days including `today`, newest first. Stops early at
/// the first representable date.
pub fn range_days(today: NaiveDate, n: u32) -> Vec<NaiveDate> {
    (0..u64::from(n))
        .map_while(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}

/// First day of the trailing `n`-day window ending at `today`, or `None` for
/// an empty window. A window reaching past the calendar is cut at
/// `NaiveDate::MIN`.
pub fn window_start(today: NaiveDate, n: u32) -> Option<NaiveDate> {
    let back = n.checked_sub(1)?;
    Some(
        today
            .checked_sub_days(Days::new(u64::from(back)))
            .unwrap_or(NaiveDate::MIN),
    )
}

/// Whether `date` falls in the trailing `n`-day window ending at `today`.
pub fn is_in_window(date: NaiveDate, today: NaiveDate, n: u32) -> bool {
    window_start(today, n).is_some_and(|start| date >= start && date <= today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_dates_are_zero_padded() {
        assert_eq!(to_iso_date(day(2024, 3, 5)), "2024-03-05");
        assert_eq!(parse_iso_date("2024-03-05").unwrap(), day(2024, 3, 5));
        assert_eq!(
            parse_iso_date("2024-03-05T00:00:00").unwrap(),
            day(2024, 3, 5)
        );
        assert!(parse_iso_date("05.03.2024").is_err());
    }

    #[test]
    fn test_range_days_is_newest_first_and_crosses_months() {
        let days = range_days(day(2024, 3, 2), 4);
        assert_eq!(
            days,
            vec![day(2024, 3, 2), day(2024, 3, 1), day(2024, 2, 29), day(2024, 2, 28)]
        );
        assert!(range_days(day(2024, 3, 2), 0).is_empty());
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let today = day(2024, 3, 31);
        assert!(is_in_window(today, today, 1));
        assert!(is_in_window(day(2024, 3, 2), today, 30));
        assert!(!is_in_window(day(2024, 3, 1), today, 30));
        assert!(!is_in_window(day(2024, 4, 1), today, 30));
        assert!(!is_in_window(today, today, 0));
    }

    #[test]
    fn test_windows_past_the_calendar_start_saturate() {
        let today = day(2024, 3, 31);
        assert_eq!(window_start(today, u32::MAX), Some(NaiveDate::MIN));
        assert_eq!(window_start(today, 0), None);
        assert!(is_in_window(day(1900, 1, 1), today, u32::MAX));
        assert!(!is_in_window(day(2024, 4, 1), today, u32::MAX));
        assert_eq!(range_days(NaiveDate::MIN, 5), vec![NaiveDate::MIN]);
    }

    #[test]
    fn test_fixed_clock_reports_its_day() {
        let clock = FixedClock(day(2025, 1, 1));
        assert_eq!(clock.today(), day(2025, 1, 1));
    }

    #[test]
    fn test_system_clock_rejects_unknown_timezone() {
        assert!(SystemClock::from_name("Asia/Almaty").is_ok());
        assert!(SystemClock::from_name("Mars/Olympus").is_err());
    }
}
