//! Seed data used when nothing has been persisted yet.
//!
//! History is derived from a fixed mixing function over (student, day), so
//! the same `today` always yields the same marks and attendance. Only the ids
//! are fresh.

use chrono::NaiveDate;

use crate::core::dates::range_days;
use crate::model::{new_id, AttendanceStatus, Mark, MarkKind, Student, User, UserRole};
use crate::model::user::DEFAULT_GROUP;

pub const DEMO_HISTORY_DAYS: u32 = 60;

const DEMO_STUDENTS: [&str; 8] = [
    "Ivan Ivanov",
    "Alexey Petrov",
    "Maria Sidorova",
    "Anna Kovaleva",
    "Dmitry Orlov",
    "Sergey Pavlov",
    "Ekaterina Smirnova",
    "Olga Romanova",
];

const MARK_POOL: [f64; 10] = [2.0, 4.0, 6.0, 8.0, 8.0, 10.0, 10.0, 12.0, 6.0, 12.0];

// splitmix64 finalizer
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Uniform-ish value in [0, 1) for a (student, day, channel) triple.
fn unit(student: usize, day: usize, channel: u64) -> f64 {
    let seed = ((student as u64) << 32) ^ ((day as u64) << 8) ^ channel;
    (mix(seed) >> 11) as f64 / (1u64 << 53) as f64
}

fn demo_student(index: usize, name: &str, today: NaiveDate) -> Student {
    let mut student = Student::new(new_id(), name, Some(DEFAULT_GROUP.to_string()));

    for (day, date) in range_days(today, DEMO_HISTORY_DAYS).into_iter().enumerate() {
        let status = if date == today {
            AttendanceStatus::None
        } else {
            match unit(index, day, 1) {
                r if r < 0.82 => AttendanceStatus::Present,
                r if r < 0.90 => AttendanceStatus::Late,
                _ => AttendanceStatus::Absent,
            }
        };
        student.attendance.insert(date, status);

        if unit(index, day, 2) < 0.6 {
            let pick = (unit(index, day, 3) * MARK_POOL.len() as f64) as usize;
            student.marks.push(Mark {
                id: new_id(),
                date,
                value: MARK_POOL[pick.min(MARK_POOL.len() - 1)],
                subject: None,
                kind: Some(if day % 11 == 0 {
                    MarkKind::Exam
                } else {
                    MarkKind::Class
                }),
            });
        }
    }
    student
}

/// Eight students with sixty days of history ending at `today`.
pub fn demo_students(today: NaiveDate) -> Vec<Student> {
    DEMO_STUDENTS
        .iter()
        .enumerate()
        .map(|(i, name)| demo_student(i, name, today))
        .collect()
}

/// Seven students, one teacher and one administrator.
pub fn demo_users() -> Vec<User> {
    let rows: [(&str, &str, &str, UserRole); 9] = [
        ("Ivan Ivanov", "ivan@example.com", "+7 705 111-11-11", UserRole::Student),
        ("Alexey Petrov", "alex@example.com", "+7 778 222-22-22", UserRole::Student),
        ("Maria Sidorova", "maria@example.com", "+7 701 333-33-33", UserRole::Student),
        ("Anna Kovaleva", "anna@example.com", "+7 700 444-44-44", UserRole::Student),
        ("Dmitry Orlov", "dmitry@example.com", "+7 702 555-55-55", UserRole::Student),
        ("Ekaterina Smirnova", "kate@example.com", "+7 777 666-66-66", UserRole::Student),
        ("Sergey Pavlov", "serg@example.com", "+7 775 777-77-77", UserRole::Student),
        ("Igor Sokolov", "teacher@example.com", "+7 706 888-88-88", UserRole::Teacher),
        ("Administrator", "admin@example.com", "+7 703 999-99-99", UserRole::Admin),
    ];

    rows.into_iter()
        .map(|(name, email, phone, role)| User {
            id: new_id(),
            name: name.to_string(),
            email: Some(email.to_string()),
            phone: Some(phone.to_string()),
            group: Some(DEFAULT_GROUP.to_string()),
            role,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 20).unwrap()
    }

    #[test]
    fn test_demo_students_cover_sixty_days_with_today_unset() {
        let students = demo_students(today());
        assert_eq!(students.len(), 8);

        for s in &students {
            assert_eq!(s.attendance.len(), DEMO_HISTORY_DAYS as usize);
            assert_eq!(s.status_on(today()), AttendanceStatus::None);
            assert!(s.marks.iter().all(|m| MARK_POOL.contains(&m.value)));
            assert!(s
                .marks
                .iter()
                .all(|m| m.date <= today() && (today() - m.date).num_days() < 60));
        }
    }

    #[test]
    fn test_demo_history_is_deterministic() {
        let a = demo_students(today());
        let b = demo_students(today());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.attendance, y.attendance);
            let xs: Vec<f64> = x.marks.iter().map(|m| m.value).collect();
            let ys: Vec<f64> = y.marks.iter().map(|m| m.value).collect();
            assert_eq!(xs, ys);
        }
    }

    #[test]
    fn test_demo_history_is_roughly_realistic() {
        let students = demo_students(today());
        let marks: usize = students.iter().map(|s| s.marks.len()).sum();
        // 8 * 60 days at 60%
        assert!((200..380).contains(&marks), "marks = {marks}");

        let present = students
            .iter()
            .flat_map(|s| s.attendance.values())
            .filter(|st| **st == AttendanceStatus::Present)
            .count();
        assert!(present > 300, "present = {present}");
    }

    #[test]
    fn test_demo_users_have_one_teacher_and_one_admin() {
        let users = demo_users();
        assert_eq!(users.len(), 9);
        assert_eq!(users.iter().filter(|u| u.role == UserRole::Teacher).count(), 1);
        assert_eq!(users.iter().filter(|u| u.role == UserRole::Admin).count(), 1);
        assert!(users
            .iter()
            .all(|u| u.group.as_deref() == Some(DEFAULT_GROUP)));
    }
}
