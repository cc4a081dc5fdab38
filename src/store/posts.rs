//! Posts slice: a local cache of remote-owned posts with load status.
//!
//! The reducer only ever stores server representations. Pending/fulfilled/
//! rejected actions are dispatched by the remote operations in
//! [`crate::store::thunks`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Post, PostId};
use crate::store::normalized::{Entity, NormalizedCollection};

/// Default number of posts fetched per list request.
pub const DEFAULT_POSTS_LIMIT: usize = 3;

pub const LIST_LOAD_FAILED: &str = "failed to load posts";
pub const POST_LOAD_FAILED: &str = "failed to load post";

impl Entity for Post {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Remote load status: `Idle -> Loading -> {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostsState {
    posts: NormalizedCollection<Post>,
    status: LoadStatus,
    error: Option<String>,
    limit: usize,
}

impl Default for PostsState {
    fn default() -> Self {
        Self {
            posts: NormalizedCollection::new(),
            status: LoadStatus::Idle,
            error: None,
            limit: DEFAULT_POSTS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostsAction {
    SetLimit(usize),
    FetchListPending,
    FetchListFulfilled(Vec<Post>),
    FetchListRejected(Option<String>),
    FetchOnePending,
    FetchOneFulfilled(Post),
    FetchOneRejected(Option<String>),
    CreateFulfilled(Post),
    UpdateFulfilled(Post),
    DeleteFulfilled(PostId),
    /// A create/update/delete call failed; the cache is untouched.
    MutationRejected(String),
}

impl PostsState {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> &[Post] {
        self.posts.as_slice()
    }

    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(&id.to_string())
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_consistent(&self) -> bool {
        self.posts.is_consistent()
    }

    pub fn reduce(&mut self, action: PostsAction) -> bool {
        match action {
            PostsAction::SetLimit(limit) => {
                self.limit = limit;
            }
            PostsAction::FetchListPending | PostsAction::FetchOnePending => {
                self.status = LoadStatus::Loading;
                self.error = None;
            }
            PostsAction::FetchListFulfilled(posts) => {
                self.status = LoadStatus::Succeeded;
                self.posts.replace_all(posts);
            }
            PostsAction::FetchListRejected(message) => {
                self.status = LoadStatus::Failed;
                self.error = Some(message.unwrap_or_else(|| LIST_LOAD_FAILED.to_string()));
            }
            PostsAction::FetchOneFulfilled(post) => {
                self.status = LoadStatus::Succeeded;
                self.posts.upsert(post);
            }
            PostsAction::FetchOneRejected(message) => {
                self.status = LoadStatus::Failed;
                self.error = Some(message.unwrap_or_else(|| POST_LOAD_FAILED.to_string()));
            }
            PostsAction::CreateFulfilled(post) => {
                self.posts.insert_front(post);
            }
            PostsAction::UpdateFulfilled(post) => {
                self.posts.upsert(post);
            }
            PostsAction::DeleteFulfilled(id) => {
                return self.posts.remove(&id.to_string()).is_some();
            }
            PostsAction::MutationRejected(message) => {
                self.error = Some(message);
            }
        }
        true
    }
}
