/// Follow service - follow graph mutations and the followed-authors feed
use super::feed::{FeedComposer, FollowView};
use super::require_user;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::metrics::FOLLOW_CHANGES_TOTAL;
use crate::middleware::AuthUser;
use crate::models::User;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    Unfollowed,
    NotFollowing,
    /// Users cannot follow themselves; nothing changes
    SelfFollow,
}

pub struct FollowService {
    store: Arc<dyn Store>,
    feed: FeedComposer,
}

impl FollowService {
    pub fn new(store: Arc<dyn Store>, feed: FeedComposer) -> Self {
        Self { store, feed }
    }

    async fn find_author(&self, username: &str) -> Result<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {}", username)))
    }

    pub async fn follow(
        &self,
        current: Option<&AuthUser>,
        author_username: &str,
    ) -> Result<(User, FollowOutcome)> {
        let auth = current.ok_or(AppError::AuthenticationRequired)?;
        let author = self.find_author(author_username).await?;
        let user = require_user(self.store.as_ref(), Some(auth)).await?;

        if user.id == author.id {
            return Ok((author, FollowOutcome::SelfFollow));
        }

        let outcome = if self.store.insert_follow(user.id, author.id).await? {
            FOLLOW_CHANGES_TOTAL.with_label_values(&["followed"]).inc();
            tracing::info!(follower = %user.username, author = %author.username, "follow created");
            FollowOutcome::Followed
        } else {
            FollowOutcome::AlreadyFollowing
        };

        Ok((author, outcome))
    }

    pub async fn unfollow(
        &self,
        current: Option<&AuthUser>,
        author_username: &str,
    ) -> Result<(User, FollowOutcome)> {
        let auth = current.ok_or(AppError::AuthenticationRequired)?;
        let author = self.find_author(author_username).await?;

        if auth.id == author.id {
            return Ok((author, FollowOutcome::SelfFollow));
        }

        let outcome = if self.store.delete_follow(auth.id, author.id).await? {
            FOLLOW_CHANGES_TOTAL.with_label_values(&["unfollowed"]).inc();
            tracing::info!(follower = %auth.username, author = %author.username, "follow removed");
            FollowOutcome::Unfollowed
        } else {
            FollowOutcome::NotFollowing
        };

        Ok((author, outcome))
    }

    pub async fn feed_for(&self, current: Option<&AuthUser>, page: usize) -> Result<FollowView> {
        let auth = current.ok_or(AppError::AuthenticationRequired)?;
        self.feed.followed(auth.id, page).await
    }
}
