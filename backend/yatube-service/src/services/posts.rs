/// Post service - post forms, creation, editing and the detail view
use super::forms::PostForm;
use super::require_user;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::metrics::CONTENT_MUTATIONS_TOTAL;
use crate::middleware::AuthUser;
use crate::models::{Comment, Group, NewPost, Post, PostChanges};
use serde::Serialize;
use std::sync::Arc;

/// Context of the create/edit form
#[derive(Debug, Serialize)]
pub struct PostFormView {
    pub form: PostForm,
    pub groups: Vec<Group>,
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailView {
    pub post: Post,
    pub comments: Vec<Comment>,
    /// Total posts by the post's author
    pub post_count: i64,
}

pub struct PostService {
    store: Arc<dyn Store>,
}

impl PostService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn post_detail(&self, post_id: i64) -> Result<PostDetailView> {
        let post = self.find_post(post_id).await?;
        let comments = self.store.list_comments(post_id).await?;
        let post_count = self
            .store
            .count_posts(crate::models::PostFilter::Author(post.author.id))
            .await?;

        Ok(PostDetailView {
            post,
            comments,
            post_count,
        })
    }

    /// Empty create form; anonymous callers are rejected
    pub async fn create_form(&self, current: Option<&AuthUser>) -> Result<PostFormView> {
        current.ok_or(AppError::AuthenticationRequired)?;
        Ok(PostFormView {
            form: PostForm::default(),
            groups: self.store.list_groups().await?,
            is_edit: false,
            post_id: None,
        })
    }

    /// Edit form pre-filled with the post's current values
    pub async fn edit_form(&self, current: Option<&AuthUser>, post_id: i64) -> Result<PostFormView> {
        let auth = current.ok_or(AppError::AuthenticationRequired)?;
        let post = self.find_post(post_id).await?;
        ensure_author(&post, auth)?;

        Ok(PostFormView {
            form: PostForm {
                text: post.text,
                group: post.group.map(|g| g.id.to_string()),
                image: post.image,
            },
            groups: self.store.list_groups().await?,
            is_edit: true,
            post_id: Some(post_id),
        })
    }

    /// Re-present a rejected submission together with the group choices
    pub async fn rejected_form(&self, form: PostForm, post_id: Option<i64>) -> Result<PostFormView> {
        Ok(PostFormView {
            form,
            groups: self.store.list_groups().await?,
            is_edit: post_id.is_some(),
            post_id,
        })
    }

    pub async fn create_post(&self, current: Option<&AuthUser>, form: &PostForm) -> Result<Post> {
        let author = require_user(self.store.as_ref(), current).await?;
        let clean = form.clean(self.store.as_ref()).await?;

        let post = self
            .store
            .insert_post(NewPost {
                author_id: author.id,
                text: clean.text,
                group_id: clean.group_id,
                image: clean.image,
            })
            .await?;

        CONTENT_MUTATIONS_TOTAL
            .with_label_values(&["post_created"])
            .inc();
        tracing::info!(post_id = post.id, author = %author.username, "post created");
        Ok(post)
    }

    /// Only the author may edit; others get `Forbidden` and the post is untouched
    pub async fn edit_post(
        &self,
        current: Option<&AuthUser>,
        post_id: i64,
        form: &PostForm,
    ) -> Result<Post> {
        let auth = current.ok_or(AppError::AuthenticationRequired)?;
        let post = self.find_post(post_id).await?;
        ensure_author(&post, auth)?;

        let clean = form.clean(self.store.as_ref()).await?;
        let updated = self
            .store
            .update_post(
                post_id,
                PostChanges {
                    text: clean.text,
                    group_id: clean.group_id,
                    image: clean.image,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post not found: {}", post_id)))?;

        CONTENT_MUTATIONS_TOTAL
            .with_label_values(&["post_edited"])
            .inc();
        tracing::info!(post_id, author = %auth.username, "post edited");
        Ok(updated)
    }

    async fn find_post(&self, post_id: i64) -> Result<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post not found: {}", post_id)))
    }
}

fn ensure_author(post: &Post, user: &AuthUser) -> Result<()> {
    if post.author.id != user.id {
        tracing::debug!(post_id = post.id, user_id = %user.id, "edit refused for non-author");
        return Err(AppError::Forbidden(format!(
            "Post {} belongs to another author",
            post.id
        )));
    }
    Ok(())
}
