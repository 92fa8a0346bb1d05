/// Business logic layer for yatube-service
///
/// - Feed composer: paginated index/group/profile/follow listings
/// - Post service: post forms, creation, editing and detail view
/// - Comment service: comments on posts
/// - Follow service: follow graph mutations and the personalized feed
pub mod comments;
pub mod feed;
pub mod follow;
pub mod forms;
pub mod posts;

pub use comments::CommentService;
pub use feed::{FeedComposer, FeedSettings};
pub use follow::{FollowOutcome, FollowService};
pub use forms::{CommentForm, PostForm};
pub use posts::PostService;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::User;

/// Resolve the caller to a stored user, syncing it from the identity claims.
///
/// Anonymous callers fail with `AuthenticationRequired`.
pub(crate) async fn require_user(store: &dyn Store, current: Option<&AuthUser>) -> Result<User> {
    let auth = current.ok_or(AppError::AuthenticationRequired)?;

    match store.get_user(auth.id).await? {
        Some(user) if user.username == auth.username => Ok(user),
        _ => {
            tracing::debug!(user_id = %auth.id, username = %auth.username, "syncing user from identity");
            store.upsert_user(auth.id, &auth.username).await
        }
    }
}
