use super::{Store, MIGRATOR};
use crate::error::{AppError, Result};
use crate::models::{
    AuthorRef, Comment, FollowCounts, Group, GroupRef, NewComment, NewGroup, NewPost, Post,
    PostChanges, PostFilter, User,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

const POST_COLUMNS: &str = r#"
    p.id, p.text, p.created_at, p.author_id, u.username AS author_username,
    p.group_id, g.slug AS group_slug, g.title AS group_title, p.image
"#;

const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created_at
"#;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
    image: Option<String>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };

        Post {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
            group,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: Uuid,
    author_username: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
            text: row.text,
            created_at: row.created_at,
        }
    }
}

/// Predicate for a listing scope; every scoped variant binds one parameter as `$1`.
fn filter_clause(filter: PostFilter) -> &'static str {
    match filter {
        PostFilter::All => "",
        PostFilter::Group(_) => "WHERE p.group_id = $1",
        PostFilter::Author(_) => "WHERE p.author_id = $1",
        PostFilter::FollowedBy(_) => {
            "WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = $1)"
        }
    }
}

fn conflict_on_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(what()),
        _ => AppError::Database(err),
    }
}

/// PostgreSQL-backed entity store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply embedded schema migrations
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        debug!("Running database migrations");
        MIGRATOR.run(&self.pool).await?;
        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn upsert_user(&self, id: Uuid, username: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("username '{}' is taken", username)))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (slug, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, slug, title, description
            "#,
        )
        .bind(&group.slug)
        .bind(&group.title)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("group slug '{}' exists", group.slug)))
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let sql = format!(
            r#"
            WITH p AS (
                INSERT INTO posts (author_id, text, group_id, image)
                VALUES ($1, $2, $3, $4)
                RETURNING id, text, created_at, author_id, group_id, image
            )
            SELECT {POST_COLUMNS}
            FROM p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post.author_id)
            .bind(&post.text)
            .bind(post.group_id)
            .bind(&post.image)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            WHERE p.id = $1
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Post::from))
    }

    async fn latest_post(&self) -> Result<Option<Post>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            ORDER BY p.id DESC
            LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Post::from))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let sql = format!(
            r#"
            WITH p AS (
                UPDATE posts
                SET text = $2, group_id = $3, image = COALESCE($4, image)
                WHERE id = $1
                RETURNING id, text, created_at, author_id, group_id, image
            )
            SELECT {POST_COLUMNS}
            FROM p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(&changes.text)
            .bind(changes.group_id)
            .bind(&changes.image)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Post::from))
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM posts p {}", filter_clause(filter));
        let query = sqlx::query_scalar::<_, i64>(&sql);
        let query = match filter {
            PostFilter::All => query,
            PostFilter::Group(id) => query.bind(id),
            PostFilter::Author(id) | PostFilter::FollowedBy(id) => query.bind(id),
        };

        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let (limit_idx, offset_idx) = match filter {
            PostFilter::All => (1, 2),
            _ => (2, 3),
        };
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            {}
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ${} OFFSET ${}
            "#,
            filter_clause(filter),
            limit_idx,
            offset_idx
        );

        let query = sqlx::query_as::<_, PostRow>(&sql);
        let query = match filter {
            PostFilter::All => query,
            PostFilter::Group(id) => query.bind(id),
            PostFilter::Author(id) | PostFilter::FollowedBy(id) => query.bind(id),
        };

        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let sql = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, author_id, text, created_at
            )
            SELECT {COMMENT_COLUMNS}
            FROM c
            JOIN users u ON u.id = c.author_id
            "#
        );

        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(&comment.text)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#
        );

        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn count_comments(&self, post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts> {
        let (followers, following): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE author_id = $1),
                (SELECT COUNT(*) FROM follows WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowCounts {
            followers,
            following,
        })
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
