//! Edu Journal - gradebook, attendance, posts and user directory for a small
//! educational platform.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          AppStore                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐            │
//! │  │  Students  │   │   Users    │   │   Posts    │◀── thunks ─┼── PostsApi
//! │  │ (journal)  │   │(directory) │   │  (cache)   │            │   (REST)
//! │  └────────────┘   └────────────┘   └────────────┘            │
//! │        │                │                                    │
//! │        ▼                ▼                                    │
//! │  ┌─────────────────────────────┐   ┌────────────┐            │
//! │  │  KeyValueStore snapshot     │   │ windowing  │ averages,  │
//! │  │  ("journal_state")          │   │            │ attendance │
//! │  └─────────────────────────────┘   └────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Students and users are owned by the client and persisted locally. Posts
//! live on a remote server and are only cached; the cache changes only when a
//! server response arrives.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use edu_journal::core::FixedClock;
//! use edu_journal::store::{AppStore, StudentsAction};
//!
//! let today = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
//! let mut store = AppStore::load_or_default(Arc::new(FixedClock(today)), None);
//!
//! let top = store.leaderboard();
//! assert_eq!(top.len(), 8);
//!
//! store.dispatch(StudentsAction::SetDaysWindow(7));
//! assert_eq!(store.days_window(), 7);
//! ```

pub mod access;
pub mod api;
pub mod config;
pub mod core;
pub mod exchange;
pub mod model;
pub mod store;

// Re-export key types at crate root for convenience
pub use access::{AccessError, Capability, Session};
pub use api::{ApiConfig, ApiError, PostsApi};
pub use config::Config;
pub use model::{AttendanceStatus, Mark, MarkKind, Post, PostId, Student, User, UserRole};
pub use store::{Action, AppStore, SharedStore};

#[cfg(feature = "remote")]
pub use api::HttpPostsApi;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
