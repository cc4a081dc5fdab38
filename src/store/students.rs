//! Gradebook and attendance slice. Client-owned.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::windowing::{leaderboard, StudentStats, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::model::{new_id, non_blank, AttendanceStatus, Mark, MarkKind, Student};
use crate::store::normalized::{Entity, NormalizedCollection};

impl Entity for Student {
    fn key(&self) -> String {
        self.id.clone()
    }
}

fn default_days_window() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn clamped_days_window<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(u32::deserialize(deserializer)?.min(MAX_WINDOW_DAYS))
}

/// Students plus the statistics window the journal is viewed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentsState {
    pub students: NormalizedCollection<Student>,
    #[serde(default = "default_days_window", deserialize_with = "clamped_days_window")]
    pub days_window: u32,
}

impl Default for StudentsState {
    fn default() -> Self {
        Self {
            students: NormalizedCollection::new(),
            days_window: DEFAULT_WINDOW_DAYS,
        }
    }
}

/// Mutations of the students slice.
///
/// Identifiers are generated by the constructors, so reducing an action is
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentsAction {
    AddStudent {
        id: String,
        name: String,
        group: Option<String>,
    },
    RemoveStudent {
        id: String,
    },
    RenameStudent {
        id: String,
        name: String,
    },
    AddMark {
        student_id: String,
        mark: Mark,
    },
    UpdateMark {
        student_id: String,
        mark_id: String,
        value: f64,
    },
    RemoveMark {
        student_id: String,
        mark_id: String,
    },
    SetAttendance {
        student_id: String,
        date: NaiveDate,
        status: AttendanceStatus,
    },
    SetDaysWindow(u32),
    /// Atomic replacement of the whole slice (CSV import).
    ReplaceAll(StudentsState),
}

impl StudentsAction {
    pub fn add_student(name: impl Into<String>, group: Option<String>) -> Self {
        Self::AddStudent {
            id: new_id(),
            name: name.into(),
            group,
        }
    }

    pub fn add_mark(
        student_id: impl Into<String>,
        value: f64,
        date: NaiveDate,
        subject: Option<String>,
        kind: Option<MarkKind>,
    ) -> Self {
        Self::AddMark {
            student_id: student_id.into(),
            mark: Mark {
                id: new_id(),
                date,
                value,
                subject: non_blank(subject),
                kind,
            },
        }
    }
}

impl StudentsState {
    pub fn new(students: Vec<Student>, days_window: u32) -> Self {
        Self {
            students: NormalizedCollection::from_vec(students),
            days_window: days_window.min(MAX_WINDOW_DAYS),
        }
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Student> {
        self.students.iter()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn stats(&self, id: &str, today: NaiveDate) -> Option<StudentStats> {
        self.student(id)
            .map(|s| StudentStats::compute(s, self.days_window, today))
    }

    pub fn leaderboard(&self, today: NaiveDate) -> Vec<StudentStats> {
        leaderboard(self.students.iter(), self.days_window, today)
    }

    /// Apply an action. Returns `false` when it addressed a missing student or
    /// mark and nothing changed.
    pub fn reduce(&mut self, action: StudentsAction) -> bool {
        match action {
            StudentsAction::AddStudent { id, name, group } => {
                self.students.insert_front(Student::new(id, name, group));
                true
            }
            StudentsAction::RemoveStudent { id } => self.students.remove(&id).is_some(),
            StudentsAction::RenameStudent { id, name } => {
                self.students.update(&id, |s| s.name = name)
            }
            StudentsAction::AddMark { student_id, mark } => {
                self.students.update(&student_id, |s| s.marks.insert(0, mark))
            }
            StudentsAction::UpdateMark {
                student_id,
                mark_id,
                value,
            } => {
                let exists = self
                    .student(&student_id)
                    .and_then(|s| s.mark(&mark_id))
                    .is_some();
                exists
                    && self.students.update(&student_id, |s| {
                        if let Some(m) = s.marks.iter_mut().find(|m| m.id == mark_id) {
                            m.value = value;
                        }
                    })
            }
            StudentsAction::RemoveMark {
                student_id,
                mark_id,
            } => {
                let exists = self
                    .student(&student_id)
                    .and_then(|s| s.mark(&mark_id))
                    .is_some();
                exists
                    && self
                        .students
                        .update(&student_id, |s| s.marks.retain(|m| m.id != mark_id))
            }
            StudentsAction::SetAttendance {
                student_id,
                date,
                status,
            } => self.students.update(&student_id, |s| {
                s.attendance.insert(date, status);
            }),
            StudentsAction::SetDaysWindow(days) => {
                if days > MAX_WINDOW_DAYS {
                    tracing::warn!("Window of {days} days clamped to {MAX_WINDOW_DAYS}");
                }
                self.days_window = days.min(MAX_WINDOW_DAYS);
                true
            }
            StudentsAction::ReplaceAll(state) => {
                *self = state;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn state_with_student() -> (StudentsState, String) {
        let mut state = StudentsState::default();
        let action = StudentsAction::add_student("Maria Sidorova", Some("JSE-242".to_string()));
        let StudentsAction::AddStudent { id, .. } = &action else {
            unreachable!()
        };
        let id = id.clone();
        assert!(state.reduce(action));
        (state, id)
    }

    #[test]
    fn test_add_student_prepends() {
        let (mut state, first) = state_with_student();
        state.reduce(StudentsAction::add_student("Anna Kovaleva", None));

        assert_eq!(state.len(), 2);
        assert_eq!(state.iter().nth(1).unwrap().id, first);
        assert!(state.students.is_consistent());
    }

    #[test]
    fn test_marks_are_newest_first_and_addressable() {
        let (mut state, id) = state_with_student();
        state.reduce(StudentsAction::add_mark(&id, 8.0, today(), None, None));
        state.reduce(StudentsAction::add_mark(
            &id,
            10.0,
            today(),
            Some("Math".to_string()),
            Some(MarkKind::Exam),
        ));

        let student = state.student(&id).unwrap();
        assert_eq!(student.marks.len(), 2);
        assert_eq!(student.marks[0].value, 10.0);

        let mark_id = student.marks[1].id.clone();
        assert!(state.reduce(StudentsAction::UpdateMark {
            student_id: id.clone(),
            mark_id: mark_id.clone(),
            value: 12.0,
        }));
        assert_eq!(state.student(&id).unwrap().mark(&mark_id).unwrap().value, 12.0);

        assert!(state.reduce(StudentsAction::RemoveMark {
            student_id: id.clone(),
            mark_id,
        }));
        assert_eq!(state.student(&id).unwrap().marks.len(), 1);
        assert!(state.students.is_consistent());
    }

    #[test]
    fn test_missing_targets_report_no_change() {
        let (mut state, id) = state_with_student();
        let before = state.clone();

        assert!(!state.reduce(StudentsAction::RenameStudent {
            id: "nope".to_string(),
            name: "x".to_string(),
        }));
        assert!(!state.reduce(StudentsAction::UpdateMark {
            student_id: id.clone(),
            mark_id: "nope".to_string(),
            value: 2.0,
        }));
        assert!(!state.reduce(StudentsAction::RemoveStudent {
            id: "nope".to_string()
        }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_attendance_keeps_one_status_per_day() {
        let (mut state, id) = state_with_student();
        for status in [AttendanceStatus::Present, AttendanceStatus::Late] {
            state.reduce(StudentsAction::SetAttendance {
                student_id: id.clone(),
                date: today(),
                status,
            });
        }
        let student = state.student(&id).unwrap();
        assert_eq!(student.attendance.len(), 1);
        assert_eq!(student.status_on(today()), AttendanceStatus::Late);

        state.reduce(StudentsAction::SetAttendance {
            student_id: id.clone(),
            date: today(),
            status: AttendanceStatus::None,
        });
        assert_eq!(
            state.student(&id).unwrap().status_on(today()),
            AttendanceStatus::None
        );
    }

    #[test]
    fn test_stats_follow_days_window() {
        let (mut state, id) = state_with_student();
        let old = today() - chrono::Duration::days(10);
        state.reduce(StudentsAction::add_mark(&id, 4.0, old, None, None));
        state.reduce(StudentsAction::add_mark(&id, 10.0, today(), None, None));

        state.reduce(StudentsAction::SetDaysWindow(7));
        assert_eq!(state.stats(&id, today()).unwrap().average_window, 10.0);

        state.reduce(StudentsAction::SetDaysWindow(30));
        assert_eq!(state.stats(&id, today()).unwrap().average_window, 7.0);
        assert!(state.stats("nope", today()).is_none());
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let (mut state, id) = state_with_student();
        state.reduce(StudentsAction::add_mark(&id, 6.0, today(), Some(" ".to_string()), None));

        assert!(state.reduce(StudentsAction::SetDaysWindow(u32::MAX)));
        assert_eq!(state.days_window, MAX_WINDOW_DAYS);
        assert_eq!(state.stats(&id, today()).unwrap().average_window, 6.0);
        assert_eq!(state.student(&id).unwrap().marks[0].subject, None);

        let stored: StudentsState =
            serde_json::from_str(r#"{"students":[],"days_window":4294967295}"#).unwrap();
        assert_eq!(stored.days_window, MAX_WINDOW_DAYS);
    }

    #[test]
    fn test_replace_all_swaps_the_slice() {
        let (mut state, _) = state_with_student();
        let replacement = StudentsState::new(vec![Student::new("x", "Oleg", None)], 14);
        state.reduce(StudentsAction::ReplaceAll(replacement.clone()));
        assert_eq!(state, replacement);
    }

    #[test]
    fn test_missing_days_window_deserializes_to_default() {
        let state: StudentsState = serde_json::from_str(r#"{"students": []}"#).unwrap();
        assert_eq!(state.days_window, DEFAULT_WINDOW_DAYS);
    }
}
