//! The application store.
//!
//! A single [`AppStore`] owns three slices: students (gradebook and
//! attendance), users (directory) and posts (cache of the remote API). All
//! writes go through [`AppStore::dispatch`], which applies one action to
//! completion and then persists the client-owned slices. Reads go through the
//! selector methods.
//!
//! Async callers share the store through [`SharedStore`]. The lock is held
//! only for the duration of a single dispatch or read, never across a remote
//! call, so overlapping remote operations settle in whatever order their
//! responses arrive.

pub mod demo;
pub mod normalized;
pub mod persist;
pub mod posts;
pub mod students;
pub mod thunks;
pub mod users;

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::access::{self, AccessError, Capability, Session};
use crate::core::dates::SharedClock;
use crate::core::windowing::StudentStats;
use crate::model::{AttendanceStatus, MarkKind, Post, PostId, Student, User};

pub use normalized::{Entity, NormalizedCollection};
pub use persist::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistError, PersistedState,
    STATE_KEY,
};
pub use posts::{LoadStatus, PostsAction, PostsState, DEFAULT_POSTS_LIMIT};
pub use students::{StudentsAction, StudentsState};
pub use thunks::Relevance;
pub use users::{UsersAction, UsersState};

/// Any store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Students(StudentsAction),
    Users(UsersAction),
    Posts(PostsAction),
}

impl From<StudentsAction> for Action {
    fn from(action: StudentsAction) -> Self {
        Self::Students(action)
    }
}

impl From<UsersAction> for Action {
    fn from(action: UsersAction) -> Self {
        Self::Users(action)
    }
}

impl From<PostsAction> for Action {
    fn from(action: PostsAction) -> Self {
        Self::Posts(action)
    }
}

impl Action {
    /// Capability a session needs to dispatch this action.
    pub fn required_capability(&self) -> Capability {
        match self {
            Self::Students(StudentsAction::SetDaysWindow(_)) => Capability::ViewJournal,
            Self::Students(StudentsAction::ReplaceAll(_)) => Capability::ImportExport,
            Self::Students(_) => Capability::EditJournal,
            Self::Users(_) => Capability::ManageUsers,
            Self::Posts(
                PostsAction::CreateFulfilled(_)
                | PostsAction::UpdateFulfilled(_)
                | PostsAction::DeleteFulfilled(_),
            ) => Capability::EditPosts,
            Self::Posts(_) => Capability::ViewPosts,
        }
    }

    /// Whether applying this action changes persisted state.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Students(_) | Self::Users(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Students(_) => "students",
            Self::Users(_) => "users",
            Self::Posts(_) => "posts",
        }
    }
}

pub struct AppStore {
    students: StudentsState,
    users: UsersState,
    posts: PostsState,
    clock: SharedClock,
    persistence: Option<Box<dyn KeyValueStore>>,
}

impl std::fmt::Debug for AppStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStore")
            .field("students", &self.students.len())
            .field("users", &self.users.len())
            .field("posts", &self.posts.posts().len())
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}

impl AppStore {
    /// Build a store from explicit slices, without persistence.
    pub fn new(clock: SharedClock, students: StudentsState, users: UsersState) -> Self {
        Self {
            students,
            users,
            posts: PostsState::default(),
            clock,
            persistence: None,
        }
    }

    /// Demo data, no persistence.
    pub fn in_memory(clock: SharedClock) -> Self {
        let today = clock.today();
        Self::new(
            clock,
            StudentsState::new(demo::demo_students(today), crate::core::DEFAULT_WINDOW_DAYS),
            UsersState::new(demo::demo_users()),
        )
    }

    /// Restore the persisted snapshot, seeding demo data for missing slices.
    ///
    /// Seeded data is written back immediately so generated ids stay stable
    /// across runs.
    pub fn load_or_default(
        clock: SharedClock,
        persistence: Option<Box<dyn KeyValueStore>>,
    ) -> Self {
        let persisted = persistence
            .as_deref()
            .map(persist::load_state)
            .unwrap_or_default();
        let today = clock.today();

        let mut seeded = false;
        let students = persisted.students.unwrap_or_else(|| {
            tracing::info!("No stored journal, seeding demo students");
            seeded = true;
            StudentsState::new(demo::demo_students(today), crate::core::DEFAULT_WINDOW_DAYS)
        });
        let users = persisted.users.unwrap_or_else(|| {
            tracing::info!("No stored users, seeding demo directory");
            seeded = true;
            UsersState::new(demo::demo_users())
        });

        let mut store = Self {
            students,
            users,
            posts: PostsState::default(),
            clock,
            persistence,
        };
        if seeded {
            store.persist_or_warn();
        }
        store
    }

    /// Apply `action`. Returns `false` when it addressed a missing entity.
    pub fn dispatch(&mut self, action: impl Into<Action>) -> bool {
        let action = action.into();
        let persisted = action.is_persisted();
        tracing::debug!(slice = action.name(), ?action, "dispatch");

        let changed = match action {
            Action::Students(a) => self.students.reduce(a),
            Action::Users(a) => self.users.reduce(a),
            Action::Posts(a) => self.posts.reduce(a),
        };

        if changed && persisted {
            self.persist_or_warn();
        }
        changed
    }

    /// Dispatch after checking the session may perform the action.
    pub fn dispatch_as(
        &mut self,
        session: &Session,
        action: impl Into<Action>,
    ) -> Result<bool, AccessError> {
        let action = action.into();
        access::require(session, action.required_capability())?;
        Ok(self.dispatch(action))
    }

    /// Write the client-owned slices to the backing store, if any.
    pub fn persist(&mut self) -> Result<(), PersistError> {
        match self.persistence.as_deref_mut() {
            Some(kv) => persist::save_state(kv, &self.students, &self.users),
            None => Ok(()),
        }
    }

    fn persist_or_warn(&mut self) {
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to persist journal state: {e}");
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn students(&self) -> &StudentsState {
        &self.students
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.student(id)
    }

    pub fn days_window(&self) -> u32 {
        self.students.days_window
    }

    pub fn student_stats(&self, id: &str) -> Option<StudentStats> {
        self.students.stats(id, self.today())
    }

    pub fn leaderboard(&self) -> Vec<StudentStats> {
        self.students.leaderboard(self.today())
    }

    pub fn users(&self) -> &UsersState {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.user(id)
    }

    pub fn posts(&self) -> &PostsState {
        &self.posts
    }

    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts.post(id)
    }

    /// Attendance action for `date`, or today when absent.
    pub fn attendance_action(
        &self,
        student_id: impl Into<String>,
        status: AttendanceStatus,
        date: Option<NaiveDate>,
    ) -> StudentsAction {
        StudentsAction::SetAttendance {
            student_id: student_id.into(),
            date: date.unwrap_or_else(|| self.today()),
            status,
        }
    }

    /// Mark action dated `date`, or today when absent.
    pub fn mark_action(
        &self,
        student_id: impl Into<String>,
        value: f64,
        date: Option<NaiveDate>,
        subject: Option<String>,
        kind: Option<MarkKind>,
    ) -> StudentsAction {
        StudentsAction::add_mark(
            student_id,
            value,
            date.unwrap_or_else(|| self.today()),
            subject,
            kind,
        )
    }
}

/// Handle to a store shared between async tasks.
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<AppStore>>,
}

impl SharedStore {
    pub fn new(store: AppStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn dispatch(&self, action: impl Into<Action>) -> bool {
        self.inner.lock().await.dispatch(action)
    }

    pub async fn dispatch_as(
        &self,
        session: &Session,
        action: impl Into<Action>,
    ) -> Result<bool, AccessError> {
        self.inner.lock().await.dispatch_as(session, action)
    }

    /// Run a selector against the current state.
    pub async fn read<R>(&self, f: impl FnOnce(&AppStore) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dates::FixedClock;
    use crate::model::UserRole;

    fn clock() -> SharedClock {
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()))
    }

    #[test]
    fn test_load_without_persistence_seeds_demo_data() {
        let store = AppStore::load_or_default(clock(), None);
        assert_eq!(store.students().len(), 8);
        assert_eq!(store.users().len(), 9);
        assert_eq!(store.posts().status(), LoadStatus::Idle);
        assert_eq!(store.days_window(), 30);
    }

    #[test]
    fn test_mutations_are_persisted_and_reloaded() {
        let kv = MemoryKeyValueStore::new();
        let mut store = AppStore::load_or_default(clock(), Some(Box::new(kv.clone())));

        let action = StudentsAction::add_student("Pavel Kim", None);
        let StudentsAction::AddStudent { id, .. } = &action else {
            unreachable!()
        };
        let id = id.clone();
        assert!(store.dispatch(action));

        let reloaded = AppStore::load_or_default(clock(), Some(Box::new(kv)));
        assert_eq!(reloaded.student(&id).unwrap().name, "Pavel Kim");
        assert_eq!(reloaded.students().len(), 9);
        assert_eq!(reloaded.users().len(), 9);
    }

    #[test]
    fn test_seeded_ids_are_stable_across_loads() {
        let kv = MemoryKeyValueStore::new();
        let first = AppStore::load_or_default(clock(), Some(Box::new(kv.clone())));
        let second = AppStore::load_or_default(clock(), Some(Box::new(kv)));
        assert_eq!(first.students(), second.students());
    }

    #[test]
    fn test_posts_are_not_persisted() {
        let kv = MemoryKeyValueStore::new();
        let mut store = AppStore::load_or_default(clock(), Some(Box::new(kv.clone())));
        store.dispatch(PostsAction::SetLimit(10));

        let raw = kv.get(STATE_KEY).unwrap().unwrap();
        assert!(!raw.contains("posts"));
        assert!(!raw.contains("limit"));
    }

    #[test]
    fn test_dispatch_as_checks_role() {
        let mut store = AppStore::in_memory(clock());
        let student = Session::new(UserRole::Student);
        let teacher = Session::new(UserRole::Teacher);

        let add = StudentsAction::add_student("New", None);
        assert!(store.dispatch_as(&student, add.clone()).is_err());
        assert_eq!(store.students().len(), 8);
        assert_eq!(store.dispatch_as(&teacher, add), Ok(true));

        assert!(store
            .dispatch_as(&student, StudentsAction::SetDaysWindow(7))
            .is_ok());
        assert!(store
            .dispatch_as(&teacher, UsersAction::DeleteUser { id: "x".into() })
            .is_err());
    }

    #[test]
    fn test_attendance_defaults_to_today() {
        let store = AppStore::in_memory(clock());
        let StudentsAction::SetAttendance { date, .. } =
            store.attendance_action("s", AttendanceStatus::Late, None)
        else {
            unreachable!()
        };
        assert_eq!(date, store.today());
    }

    #[tokio::test]
    async fn test_shared_store_reads_after_dispatch() {
        let shared = SharedStore::new(AppStore::in_memory(clock()));
        shared.dispatch(StudentsAction::SetDaysWindow(14)).await;
        assert_eq!(shared.read(|s| s.days_window()).await, 14);
    }
}
