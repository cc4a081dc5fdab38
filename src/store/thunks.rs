//! Remote post operations.
//!
//! Each operation dispatches into the posts slice when it starts and again
//! when the remote call settles. The store lock is released while the call is
//! in flight. Remote failures are recorded in the slice, never returned.
//!
//! Overlapping operations on the same post settle in response order: whichever
//! response arrives last is what the cache holds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::posts::PostsAction;
use super::SharedStore;
use crate::access::{self, AccessError, Capability, Session};
use crate::api::{ApiError, ListParams, PostsApi};
use crate::model::validation::validate_image;
use crate::model::{Post, PostId, PostPatch, PostPayload, ValidationError};

/// Flag shared between an operation and the view that started it.
///
/// Once detached, the operation's result is dropped instead of applied.
#[derive(Debug, Clone)]
pub struct Relevance(Arc<AtomicBool>);

impl Default for Relevance {
    fn default() -> Self {
        Self::always()
    }
}

impl Relevance {
    pub fn always() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn detach(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_relevant(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Rejections that happen before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Optional image attached to a create/update form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime: String,
    pub size: u64,
}

impl ImageAttachment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_image(&self.mime, self.size)
    }
}

fn message(err: &ApiError) -> String {
    tracing::error!("Posts API call failed: {err}");
    err.to_string()
}

/// Fetch the first `limit` posts and replace the cached list.
pub async fn fetch_posts(store: &SharedStore, api: &dyn PostsApi) -> bool {
    let limit = store.read(|s| s.posts().limit()).await;
    store.dispatch(PostsAction::FetchListPending).await;

    match api.list(ListParams::first(limit)).await {
        Ok(posts) => {
            tracing::info!("Loaded {} posts", posts.len());
            store.dispatch(PostsAction::FetchListFulfilled(posts)).await;
            true
        }
        Err(e) => {
            store
                .dispatch(PostsAction::FetchListRejected(Some(message(&e))))
                .await;
            false
        }
    }
}

/// Fetch one post, refreshing its cached copy.
pub async fn fetch_post_by_id(store: &SharedStore, api: &dyn PostsApi, id: &PostId) -> Option<Post> {
    store.dispatch(PostsAction::FetchOnePending).await;

    match api.get(id).await {
        Ok(post) => {
            store
                .dispatch(PostsAction::FetchOneFulfilled(post.clone()))
                .await;
            Some(post)
        }
        Err(e) => {
            store
                .dispatch(PostsAction::FetchOneRejected(Some(message(&e))))
                .await;
            None
        }
    }
}

/// Outcome of loading a post for a detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailLoad {
    Loaded(Post),
    Failed(String),
    /// The view went away before the call settled.
    Dropped,
}

/// Load a post for a detail view. The result is applied only while
/// `relevance` is still attached.
pub async fn load_post_detail(
    store: &SharedStore,
    api: &dyn PostsApi,
    id: &PostId,
    relevance: &Relevance,
) -> DetailLoad {
    let result = api.get(id).await;

    if !relevance.is_relevant() {
        tracing::debug!(%id, "Dropping post detail for a detached view");
        return DetailLoad::Dropped;
    }

    match result {
        Ok(post) => {
            store
                .dispatch(PostsAction::FetchOneFulfilled(post.clone()))
                .await;
            DetailLoad::Loaded(post)
        }
        Err(e) => DetailLoad::Failed(message(&e)),
    }
}

/// Validate and create a post. `Ok(None)` means the server rejected it and
/// the error is in the slice.
pub async fn create_post(
    store: &SharedStore,
    api: &dyn PostsApi,
    session: &Session,
    payload: PostPayload,
    image: Option<&ImageAttachment>,
) -> Result<Option<Post>, RequestError> {
    access::require(session, Capability::EditPosts)?;
    let payload = payload.normalized()?;
    if let Some(image) = image {
        image.validate()?;
    }

    match api.create(&payload).await {
        Ok(post) => {
            store.dispatch(PostsAction::CreateFulfilled(post.clone())).await;
            Ok(Some(post))
        }
        Err(e) => {
            store.dispatch(PostsAction::MutationRejected(message(&e))).await;
            Ok(None)
        }
    }
}

/// Send a partial update and cache the server's representation.
pub async fn update_post(
    store: &SharedStore,
    api: &dyn PostsApi,
    session: &Session,
    id: &PostId,
    patch: PostPatch,
    image: Option<&ImageAttachment>,
) -> Result<Option<Post>, RequestError> {
    access::require(session, Capability::EditPosts)?;
    patch.validate()?;
    if let Some(image) = image {
        image.validate()?;
    }

    match api.update(id, &patch).await {
        Ok(post) => {
            store.dispatch(PostsAction::UpdateFulfilled(post.clone())).await;
            Ok(Some(post))
        }
        Err(e) => {
            store.dispatch(PostsAction::MutationRejected(message(&e))).await;
            Ok(None)
        }
    }
}

/// Delete on the server, then drop the cached copy.
pub async fn delete_post(
    store: &SharedStore,
    api: &dyn PostsApi,
    session: &Session,
    id: &PostId,
) -> Result<bool, RequestError> {
    access::require(session, Capability::EditPosts)?;

    match api.delete(id).await {
        Ok(deleted) => {
            store.dispatch(PostsAction::DeleteFulfilled(deleted)).await;
            Ok(true)
        }
        Err(e) => {
            store.dispatch(PostsAction::MutationRejected(message(&e))).await;
            Ok(false)
        }
    }
}
