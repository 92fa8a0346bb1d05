/// Comment service - comments on posts
use super::forms::CommentForm;
use super::require_user;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::metrics::CONTENT_MUTATIONS_TOTAL;
use crate::middleware::AuthUser;
use crate::models::{Comment, NewComment};
use std::sync::Arc;

pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn add_comment(
        &self,
        current: Option<&AuthUser>,
        post_id: i64,
        form: &CommentForm,
    ) -> Result<Comment> {
        let auth = current.ok_or(AppError::AuthenticationRequired)?;
        if self.store.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Post not found: {}", post_id)));
        }
        let text = form.clean()?;
        let author = require_user(self.store.as_ref(), Some(auth)).await?;

        let comment = self
            .store
            .insert_comment(NewComment {
                post_id,
                author_id: author.id,
                text,
            })
            .await?;

        CONTENT_MUTATIONS_TOTAL
            .with_label_values(&["comment_created"])
            .inc();
        tracing::info!(post_id, comment_id = comment.id, author = %author.username, "comment added");
        Ok(comment)
    }
}
