//! CSV codecs for the journal and the user directory.
//!
//! The journal is flattened into one table whose `record` column says what a
//! row carries:
//!
//! | record       | columns used                                   |
//! |--------------|------------------------------------------------|
//! | `window`     | `value` (days window)                          |
//! | `student`    | `student_id`, `name`, `group`                  |
//! | `mark`       | `student_id`, `mark_id`, `date`, `value`, `subject`, `kind` |
//! | `attendance` | `student_id`, `date`, `status`                 |
//!
//! Mark and attendance rows must follow their student's row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};

use super::ExchangeError;
use crate::core::windowing::{DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::model::{new_id, non_blank, AttendanceStatus, Mark, MarkKind, Student, User, UserRole};
use crate::store::{StudentsState, UsersState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordKind {
    Window,
    Student,
    Mark,
    Attendance,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JournalRow {
    record: Option<RecordKind>,
    student_id: Option<String>,
    name: Option<String>,
    group: Option<String>,
    mark_id: Option<String>,
    date: Option<NaiveDate>,
    value: Option<f64>,
    subject: Option<String>,
    kind: Option<MarkKind>,
    status: Option<AttendanceStatus>,
}

impl JournalRow {
    fn of(record: RecordKind, student_id: &str) -> Self {
        Self {
            record: Some(record),
            student_id: Some(student_id.to_string()),
            ..Self::default()
        }
    }
}

/// Write the whole journal, window first.
pub fn export_students<W: Write>(state: &StudentsState, out: W) -> Result<usize, ExchangeError> {
    let mut writer = csv::Writer::from_writer(out);
    let mut rows = 0usize;

    writer.serialize(JournalRow {
        record: Some(RecordKind::Window),
        value: Some(f64::from(state.days_window)),
        ..JournalRow::default()
    })?;
    rows += 1;

    for student in state.iter() {
        writer.serialize(JournalRow {
            name: Some(student.name.clone()),
            group: student.group.clone(),
            ..JournalRow::of(RecordKind::Student, &student.id)
        })?;
        rows += 1;

        for mark in &student.marks {
            writer.serialize(JournalRow {
                mark_id: Some(mark.id.clone()),
                date: Some(mark.date),
                value: Some(mark.value),
                subject: mark.subject.clone(),
                kind: mark.kind,
                ..JournalRow::of(RecordKind::Mark, &student.id)
            })?;
            rows += 1;
        }

        for (date, status) in &student.attendance {
            writer.serialize(JournalRow {
                date: Some(*date),
                status: Some(*status),
                ..JournalRow::of(RecordKind::Attendance, &student.id)
            })?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}

fn required<T>(value: Option<T>, line: usize, column: &str) -> Result<T, ExchangeError> {
    value.ok_or_else(|| ExchangeError::Invalid {
        line,
        message: format!("missing `{column}`"),
    })
}

/// Parse a full journal. Nothing is returned unless every row is valid.
pub fn import_students<R: Read>(input: R) -> Result<StudentsState, ExchangeError> {
    let mut reader = csv::Reader::from_reader(input);
    let mut days_window = DEFAULT_WINDOW_DAYS;
    let mut students: Vec<Student> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, result) in reader.deserialize::<JournalRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = result?;

        match required(row.record, line, "record")? {
            RecordKind::Window => {
                let value = required(row.value, line, "value")?;
                if value < 0.0 || value.fract() != 0.0 || value > f64::from(MAX_WINDOW_DAYS) {
                    return Err(ExchangeError::Invalid {
                        line,
                        message: format!(
                            "window must be a whole number of days up to {MAX_WINDOW_DAYS}, got {value}"
                        ),
                    });
                }
                days_window = value as u32;
            }
            RecordKind::Student => {
                let id = required(row.student_id, line, "student_id")?;
                let name = required(row.name, line, "name")?;
                if index.contains_key(&id) {
                    tracing::warn!("line {line}: duplicate student {id}, keeping the first");
                    continue;
                }
                index.insert(id.clone(), students.len());
                students.push(Student::new(id, name, row.group));
            }
            RecordKind::Mark => {
                let student_id = required(row.student_id, line, "student_id")?;
                let slot = owner(&index, &student_id, line)?;
                students[slot].marks.push(Mark {
                    id: row.mark_id.unwrap_or_else(new_id),
                    date: required(row.date, line, "date")?,
                    value: required(row.value, line, "value")?,
                    subject: non_blank(row.subject),
                    kind: row.kind,
                });
            }
            RecordKind::Attendance => {
                let student_id = required(row.student_id, line, "student_id")?;
                let slot = owner(&index, &student_id, line)?;
                students[slot].attendance.insert(
                    required(row.date, line, "date")?,
                    row.status.unwrap_or_default(),
                );
            }
        }
    }

    Ok(StudentsState::new(students, days_window))
}

fn owner(index: &HashMap<String, usize>, student_id: &str, line: usize) -> Result<usize, ExchangeError> {
    index.get(student_id).copied().ok_or_else(|| ExchangeError::Invalid {
        line,
        message: format!("row refers to unknown student `{student_id}`"),
    })
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    group: Option<String>,
    role: Option<UserRole>,
}

pub fn export_users<W: Write>(state: &UsersState, out: W) -> Result<usize, ExchangeError> {
    let mut writer = csv::Writer::from_writer(out);
    for user in state.iter() {
        writer.serialize(UserRow {
            id: Some(user.id.clone()),
            name: Some(user.name.clone()),
            email: user.email.clone(),
            phone: user.phone.clone(),
            group: user.group.clone(),
            role: Some(user.role),
        })?;
    }
    writer.flush()?;
    Ok(state.len())
}

/// Parse a user directory. Rows without an id get a fresh one; rows without
/// a role are students.
pub fn import_users<R: Read>(input: R) -> Result<UsersState, ExchangeError> {
    let mut reader = csv::Reader::from_reader(input);
    let mut users = Vec::new();

    for (i, result) in reader.deserialize::<UserRow>().enumerate() {
        let line = i + 2;
        let row = result?;
        let name = required(row.name, line, "name")?.trim().to_string();
        if name.is_empty() {
            return Err(ExchangeError::Invalid {
                line,
                message: "name is required".to_string(),
            });
        }

        users.push(User {
            id: row.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(new_id),
            name,
            email: non_blank(row.email),
            phone: non_blank(row.phone),
            group: non_blank(row.group),
            role: row.role.unwrap_or_default(),
        });
    }

    Ok(UsersState::new(users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StudentsAction;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn sample_journal() -> StudentsState {
        let mut ivan = Student::new("s1", "Ivan Ivanov", Some("JSE-242".to_string()));
        ivan.marks.push(Mark {
            id: "m2".to_string(),
            date: d(3),
            value: 10.0,
            subject: Some("Math, algebra".to_string()),
            kind: Some(MarkKind::Exam),
        });
        ivan.marks.push(Mark {
            id: "m1".to_string(),
            date: d(2),
            value: 7.5,
            subject: None,
            kind: None,
        });
        ivan.attendance.insert(d(2), AttendanceStatus::Present);
        ivan.attendance.insert(d(3), AttendanceStatus::None);

        let anna = Student::new("s2", "Anna Kovaleva", None);
        StudentsState::new(vec![ivan, anna], 14)
    }

    #[test]
    fn test_journal_survives_export_and_import() {
        let state = sample_journal();
        let mut buf = Vec::new();
        let rows = export_students(&state, &mut buf).unwrap();
        assert_eq!(rows, 1 + 2 + 2 + 2);

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("record,student_id,name,group,mark_id,date,value,subject,kind,status"));

        let back = import_students(buf.as_slice()).unwrap();
        assert_eq!(back, state);
        assert!(back.students.is_consistent());
    }

    #[test]
    fn test_orphan_mark_is_rejected_with_line() {
        let csv = "\
record,student_id,name,group,mark_id,date,value,subject,kind,status
mark,ghost,,,m1,2024-09-01,8,,,
";
        let err = import_students(csv.as_bytes()).unwrap_err();
        match err {
            ExchangeError::Invalid { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("ghost"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_window_uses_default() {
        let csv = "\
record,student_id,name,group,mark_id,date,value,subject,kind,status
student,s1,Oleg,,,,,,,
attendance,s1,,,,2024-09-01,,,,late
";
        let state = import_students(csv.as_bytes()).unwrap();
        assert_eq!(state.days_window, DEFAULT_WINDOW_DAYS);
        assert_eq!(
            state.student("s1").unwrap().status_on(d(1)),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn test_fractional_window_is_rejected() {
        let csv = "\
record,student_id,name,group,mark_id,date,value,subject,kind,status
window,,,,,,7.5,,,
";
        assert!(matches!(
            import_students(csv.as_bytes()),
            Err(ExchangeError::Invalid { line: 2, .. })
        ));
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        for value in ["1e12", "36501"] {
            let csv = format!(
                "record,student_id,name,group,mark_id,date,value,subject,kind,status\n\
                 window,,,,,,{value},,,\n"
            );
            assert!(matches!(
                import_students(csv.as_bytes()),
                Err(ExchangeError::Invalid { line: 2, .. })
            ));
        }

        let csv = "\
record,student_id,name,group,mark_id,date,value,subject,kind,status
window,,,,,,36500,,,
";
        assert_eq!(import_students(csv.as_bytes()).unwrap().days_window, MAX_WINDOW_DAYS);
    }

    #[test]
    fn test_entries_with_blank_fields_survive_export_and_import() {
        let mut state = StudentsState::default();
        state.reduce(StudentsAction::add_student("Pavel Kim", Some(String::new())));
        let id = state.iter().next().unwrap().id.clone();
        state.reduce(StudentsAction::add_mark(&id, 8.0, d(4), Some(String::new()), None));

        let mut buf = Vec::new();
        export_students(&state, &mut buf).unwrap();
        assert_eq!(import_students(buf.as_slice()).unwrap(), state);

        let mut users = UsersState::default();
        let added = crate::store::UsersAction::add_user(crate::model::NewUser {
            name: Some("Pavel Kim".to_string()),
            ..crate::model::NewUser::default()
        })
        .unwrap();
        users.reduce(added);

        let mut buf = Vec::new();
        export_users(&users, &mut buf).unwrap();
        assert_eq!(import_users(buf.as_slice()).unwrap(), users);
    }

    #[test]
    fn test_imported_journal_replaces_state_atomically() {
        let mut state = StudentsState::default();
        state.reduce(StudentsAction::add_student("To be replaced", None));

        let mut buf = Vec::new();
        export_students(&sample_journal(), &mut buf).unwrap();
        let imported = import_students(buf.as_slice()).unwrap();
        state.reduce(StudentsAction::ReplaceAll(imported));

        assert_eq!(state.len(), 2);
        assert!(state.student("s1").is_some());
    }

    #[test]
    fn test_users_survive_export_and_import() {
        let users = UsersState::new(crate::store::demo::demo_users());
        let mut buf = Vec::new();
        assert_eq!(export_users(&users, &mut buf).unwrap(), 9);

        let back = import_users(buf.as_slice()).unwrap();
        assert_eq!(back, users);
    }

    #[test]
    fn test_user_rows_fill_defaults() {
        let csv = "\
id,name,email,phone,group,role
,Pavel Kim,,,,
";
        let users = import_users(csv.as_bytes()).unwrap();
        let user = users.iter().next().unwrap();
        assert!(!user.id.is_empty());
        assert_eq!(user.role, UserRole::Student);
    }

    #[test]
    fn test_blank_user_name_is_rejected() {
        let csv = "\
id,name,email,phone,group,role
u1,  ,,,,admin
";
        assert!(matches!(
            import_users(csv.as_bytes()),
            Err(ExchangeError::Invalid { line: 2, .. })
        ));
    }
}
