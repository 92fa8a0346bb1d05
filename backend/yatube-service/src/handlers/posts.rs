/// Post handlers - detail view, create/edit forms and comments
use super::{login_redirect, post_url, profile_url, redirect, SiteSettings};
use crate::db::Store;
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::CurrentUser;
use crate::services::posts::PostFormView;
use crate::services::{CommentForm, CommentService, PostForm, PostService};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::sync::Arc;

/// Submitted form re-presented with its field errors
#[derive(Debug, Serialize)]
struct RejectedForm<T: Serialize> {
    #[serde(flatten)]
    context: T,
    errors: FieldErrors,
}

fn rejected<T: Serialize>(context: T, errors: FieldErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(RejectedForm { context, errors })
}

/// Form body extracted after the login check.
///
/// Anonymous submissions redirect to login whatever the body looks like;
/// for signed-in users a missing or malformed body keeps actix's error.
type FormBody<T> = std::result::Result<web::Form<T>, actix_web::Error>;

fn signed_in_form<T>(
    req: &HttpRequest,
    site: &SiteSettings,
    user: &CurrentUser,
    form: FormBody<T>,
) -> std::result::Result<T, HttpResponse> {
    if user.user().is_none() {
        return Err(login_redirect(req, site));
    }
    form.map(web::Form::into_inner).map_err(HttpResponse::from_error)
}

pub async fn post_detail(
    store: web::Data<Arc<dyn Store>>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let service = PostService::new(store.get_ref().clone());
    let view = service.post_detail(*post_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn create_form(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    site: web::Data<SiteSettings>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    let service = PostService::new(store.get_ref().clone());
    match service.create_form(user.user()).await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(AppError::AuthenticationRequired) => Ok(login_redirect(&req, &site)),
        Err(err) => Err(err),
    }
}

/// Create a post and redirect to the author's profile
pub async fn create_post(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    site: web::Data<SiteSettings>,
    user: CurrentUser,
    form: FormBody<PostForm>,
) -> Result<HttpResponse> {
    let service = PostService::new(store.get_ref().clone());
    let form = match signed_in_form(&req, &site, &user, form) {
        Ok(form) => form,
        Err(response) => return Ok(response),
    };

    match service.create_post(user.user(), &form).await {
        Ok(post) => Ok(redirect(&profile_url(&post.author.username))),
        Err(AppError::AuthenticationRequired) => Ok(login_redirect(&req, &site)),
        Err(AppError::Validation(errors)) => {
            let context: PostFormView = service.rejected_form(form, None).await?;
            Ok(rejected(context, errors))
        }
        Err(err) => Err(err),
    }
}

pub async fn edit_form(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    site: web::Data<SiteSettings>,
    user: CurrentUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let service = PostService::new(store.get_ref().clone());

    match service.edit_form(user.user(), post_id).await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(AppError::AuthenticationRequired) => Ok(login_redirect(&req, &site)),
        Err(AppError::Forbidden(_)) => Ok(redirect(&post_url(post_id))),
        Err(err) => Err(err),
    }
}

/// Apply an edit and redirect to the post's detail view
pub async fn edit_post(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    site: web::Data<SiteSettings>,
    user: CurrentUser,
    post_id: web::Path<i64>,
    form: FormBody<PostForm>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let service = PostService::new(store.get_ref().clone());
    let form = match signed_in_form(&req, &site, &user, form) {
        Ok(form) => form,
        Err(response) => return Ok(response),
    };

    match service.edit_post(user.user(), post_id, &form).await {
        Ok(post) => Ok(redirect(&post_url(post.id))),
        Err(AppError::AuthenticationRequired) => Ok(login_redirect(&req, &site)),
        Err(AppError::Forbidden(_)) => Ok(redirect(&post_url(post_id))),
        Err(AppError::Validation(errors)) => {
            let context = service.rejected_form(form, Some(post_id)).await?;
            Ok(rejected(context, errors))
        }
        Err(err) => Err(err),
    }
}

#[derive(Debug, Serialize)]
struct CommentFormView {
    form: CommentForm,
    post_id: i64,
}

/// Add a comment and redirect to the post's detail view
pub async fn add_comment(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    site: web::Data<SiteSettings>,
    user: CurrentUser,
    post_id: web::Path<i64>,
    form: FormBody<CommentForm>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let service = CommentService::new(store.get_ref().clone());
    let form = match signed_in_form(&req, &site, &user, form) {
        Ok(form) => form,
        Err(response) => return Ok(response),
    };

    match service.add_comment(user.user(), post_id, &form).await {
        Ok(_) => Ok(redirect(&post_url(post_id))),
        Err(AppError::AuthenticationRequired) => Ok(login_redirect(&req, &site)),
        Err(AppError::Validation(errors)) => {
            Ok(rejected(CommentFormView { form, post_id }, errors))
        }
        Err(err) => Err(err),
    }
}
