/// Entity store
///
/// `Store` is the persistence port used by every service. Two backends
/// implement it:
/// - `PgStore`: PostgreSQL through sqlx, schema managed by `MIGRATOR`
/// - `MemoryStore`: process-local state for tests and local development
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{
    Comment, FollowCounts, Group, NewComment, NewGroup, NewPost, Post, PostChanges, PostFilter,
    User,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Create the user or refresh its username
    async fn upsert_user(&self, id: Uuid, username: &str) -> Result<User>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Fails with `Conflict` when the slug is taken
    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn get_group(&self, id: i64) -> Result<Option<Group>>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn insert_post(&self, post: NewPost) -> Result<Post>;

    async fn get_post(&self, id: i64) -> Result<Option<Post>>;

    /// Most recently inserted post
    async fn latest_post(&self) -> Result<Option<Post>>;

    /// Returns `None` when the post does not exist
    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<Post>>;

    async fn delete_post(&self, id: i64) -> Result<bool>;

    async fn count_posts(&self, filter: PostFilter) -> Result<i64>;

    /// Newest first, ties broken by id descending
    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>>;

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Oldest first
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>>;

    async fn count_comments(&self, post_id: i64) -> Result<i64>;

    /// Idempotent; returns true if a new edge was created
    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool>;

    /// Idempotent; returns true if an edge was removed
    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool>;

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool>;

    async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Create a PostgreSQL connection pool and verify it with `SELECT 1`
pub async fn create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!("Database pool created and verified successfully");

    Ok(pool)
}
