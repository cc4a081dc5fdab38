//! Domain types for the journal, the user directory and posts.
//!
//! Journal and user types are client-owned: the local store is their source of
//! truth. Posts are remote-owned and only cached locally.

pub mod journal;
pub mod post;
pub mod user;
pub mod validation;

pub use journal::{AttendanceStatus, Mark, MarkKind, Student};
pub use post::{Post, PostId, PostPatch, PostPayload};
pub use user::{NewUser, User, UserPatch, UserRole};
pub use validation::ValidationError;

/// Generate a fresh identifier for a client-owned entity.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Blank optional text is stored as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
