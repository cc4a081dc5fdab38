//! Trailing day windows and the statistics computed over them.
//!
//! A window covers `days` consecutive calendar days ending at "today",
//! inclusive on both ends. Windows are recomputed from scratch on each call.

use crate::core::dates::{range_days, window_start};
use crate::model::{AttendanceStatus, Mark, Student};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Default window size for journal statistics, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Largest window the journal stores, in days.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// A trailing window of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    /// First day in the window
    pub start: NaiveDate,
    /// Last day in the window ("today")
    pub end: NaiveDate,
    /// Number of days covered
    pub days: u32,
}

impl DayWindow {
    /// Window of `days` days ending at `today`. A zero-day window contains
    /// nothing; a window reaching past the calendar starts at its first day.
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        Self {
            start: window_start(today, days).unwrap_or(today),
            end: today,
            days,
        }
    }

    /// Check if a date falls within this window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days > 0 && date >= self.start && date <= self.end
    }

    /// Every date in the window, newest first.
    pub fn dates(&self) -> Vec<NaiveDate> {
        range_days(self.end, self.span_days())
    }

    /// Calendar days actually covered, which is less than `days` when the
    /// window was cut at the calendar start.
    pub fn span_days(&self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        u32::try_from((self.end - self.start).num_days() + 1).unwrap_or(self.days)
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }
}

/// Attendance percentages over a window.
///
/// Each percentage is rounded independently, so the three may not add up to
/// exactly 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceBreakdown {
    pub present_pct: u32,
    pub absent_pct: u32,
    pub late_pct: u32,
    /// Raw tallies behind the percentages
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    /// Days in the window with no record (or an explicit `none`)
    pub unrecorded: u32,
}

impl AttendanceBreakdown {
    /// Days that count towards the denominator.
    pub fn recorded(&self) -> u32 {
        self.present + self.absent + self.late
    }

    pub fn pct_sum(&self) -> u32 {
        self.present_pct + self.absent_pct + self.late_pct
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean_value<'a>(marks: impl Iterator<Item = &'a Mark>) -> f64 {
    let values: Vec<f64> = marks.map(|m| m.value).collect();
    if values.is_empty() {
        return 0.0;
    }
    round1(values.mean())
}

/// Mean mark value inside the trailing window, rounded to one decimal.
///
/// Returns `0.0` when no mark falls inside the window.
pub fn average(marks: &[Mark], window_days: u32, today: NaiveDate) -> f64 {
    let window = DayWindow::trailing(today, window_days);
    mean_value(marks.iter().filter(|m| window.contains(m.date)))
}

/// Mean over all marks regardless of date.
pub fn average_all(marks: &[Mark]) -> f64 {
    mean_value(marks.iter())
}

/// Tally attendance over every day of the window and convert to percentages.
///
/// Dates missing from the map count as `none`; `none` days are excluded from
/// the denominator, which is floored at 1.
pub fn attendance_breakdown(
    attendance: &BTreeMap<NaiveDate, AttendanceStatus>,
    window_days: u32,
    today: NaiveDate,
) -> AttendanceBreakdown {
    let window = DayWindow::trailing(today, window_days);
    let mut out = AttendanceBreakdown::default();

    if !window.is_empty() {
        for status in attendance.range(window.start..=window.end).map(|(_, s)| *s) {
            match status {
                AttendanceStatus::Present => out.present += 1,
                AttendanceStatus::Absent => out.absent += 1,
                AttendanceStatus::Late => out.late += 1,
                AttendanceStatus::None => {}
            }
        }
    }
    out.unrecorded = window.span_days() - out.recorded();

    let total = f64::from(out.recorded().max(1));
    let pct = |count: u32| (f64::from(count) / total * 100.0).round() as u32;
    out.present_pct = pct(out.present);
    out.absent_pct = pct(out.absent);
    out.late_pct = pct(out.late);
    out
}

/// Per-student summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentStats {
    pub student_id: String,
    pub name: String,
    pub group: Option<String>,
    pub average_all: f64,
    pub average_window: f64,
    pub attendance: AttendanceBreakdown,
}

impl StudentStats {
    pub fn compute(student: &Student, window_days: u32, today: NaiveDate) -> Self {
        Self {
            student_id: student.id.clone(),
            name: student.name.clone(),
            group: student.group.clone(),
            average_all: average_all(&student.marks),
            average_window: average(&student.marks, window_days, today),
            attendance: attendance_breakdown(&student.attendance, window_days, today),
        }
    }
}

/// Students ranked by windowed average, highest first. Ties keep input order.
pub fn leaderboard<'a>(
    students: impl IntoIterator<Item = &'a Student>,
    window_days: u32,
    today: NaiveDate,
) -> Vec<StudentStats> {
    let mut rows: Vec<StudentStats> = students
        .into_iter()
        .map(|s| StudentStats::compute(s, window_days, today))
        .collect();
    rows.sort_by(|a, b| {
        b.average_window
            .partial_cmp(&a.average_window)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}
