//! Gradebook and attendance types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Attendance state for a single day.
///
/// `None` is both the default for unrecorded dates and an explicit
/// clearing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    #[default]
    None,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::None => "none",
        }
    }

    /// Whether this status counts towards the attendance denominator.
    pub fn is_recorded(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "late" => Ok(Self::Late),
            "none" | "" => Ok(Self::None),
            other => Err(format!(
                "unknown attendance status `{other}`; expected present|absent|late|none"
            )),
        }
    }
}

/// Kind of assessment a mark was given for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Class,
    #[serde(rename = "self")]
    SelfStudy,
    Exam,
    Topic,
}

impl MarkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::SelfStudy => "self",
            Self::Exam => "exam",
            Self::Topic => "topic",
        }
    }
}

impl FromStr for MarkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" => Ok(Self::Class),
            "self" => Ok(Self::SelfStudy),
            "exam" => Ok(Self::Exam),
            "topic" => Ok(Self::Topic),
            other => Err(format!(
                "unknown mark kind `{other}`; expected class|self|exam|topic"
            )),
        }
    }
}

/// A single mark. Only `value` may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub id: String,
    pub date: NaiveDate,
    /// Expected range 2..=12; not enforced.
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MarkKind>,
}

/// A student with marks (newest first) and per-day attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub marks: Vec<Mark>,
    #[serde(default)]
    pub attendance: BTreeMap<NaiveDate, AttendanceStatus>,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>, group: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: super::non_blank(group),
            marks: Vec::new(),
            attendance: BTreeMap::new(),
        }
    }

    pub fn mark(&self, mark_id: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.id == mark_id)
    }

    /// Recorded status for a date, `None` when unrecorded.
    pub fn status_on(&self, date: NaiveDate) -> AttendanceStatus {
        self.attendance.get(&date).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_status_parses_case_insensitively() {
        assert_eq!(
            "Present".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::Present
        );
        assert_eq!(
            " late ".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::Late
        );
        assert_eq!(
            "".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::None
        );
        assert!("sick".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_mark_kind_serializes_self_keyword() {
        let json = serde_json::to_string(&MarkKind::SelfStudy).unwrap();
        assert_eq!(json, "\"self\"");
        let kind: MarkKind = serde_json::from_str("\"exam\"").unwrap();
        assert_eq!(kind, MarkKind::Exam);
    }

    #[test]
    fn test_student_attendance_defaults_to_none() {
        let mut student = Student::new("s1", "Ivan Ivanov", None);
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(student.status_on(day), AttendanceStatus::None);

        student.attendance.insert(day, AttendanceStatus::Absent);
        assert_eq!(student.status_on(day), AttendanceStatus::Absent);
    }

    #[test]
    fn test_student_json_uses_iso_date_keys() {
        let mut student = Student::new("s1", "Ivan Ivanov", Some("JSE-242".to_string()));
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        student.attendance.insert(day, AttendanceStatus::Present);
        student.marks.push(Mark {
            id: "m1".to_string(),
            date: day,
            value: 10.0,
            subject: None,
            kind: Some(MarkKind::Class),
        });

        let json = serde_json::to_value(&student).unwrap();
        assert_eq!(json["attendance"]["2024-03-01"], "present");
        assert_eq!(json["marks"][0]["date"], "2024-03-01");
        assert_eq!(json["marks"][0]["type"], "class");

        let back: Student = serde_json::from_value(json).unwrap();
        assert_eq!(back, student);
    }
}
