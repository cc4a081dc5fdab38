//! Core computations for the journal.
//!
//! This module contains:
//! - Calendar-day utilities with an injectable clock
//! - Trailing-window statistics (averages, attendance breakdown)

pub mod dates;
pub mod windowing;

// Re-export commonly used types
pub use dates::{
    is_in_window, parse_iso_date, range_days, to_iso_date, window_start, Clock, FixedClock,
    SharedClock, SystemClock,
};
pub use windowing::{
    attendance_breakdown, average, average_all, leaderboard, AttendanceBreakdown, DayWindow,
    StudentStats, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS,
};
