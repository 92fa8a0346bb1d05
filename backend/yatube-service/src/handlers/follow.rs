/// Follow handlers - both redirect back to the author's profile
use super::{feed_composer, login_redirect, profile_url, redirect, SiteSettings};
use crate::cache::PageCache;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::User;
use crate::services::{FollowOutcome, FollowService};
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;

fn follow_service(
    store: &web::Data<Arc<dyn Store>>,
    cache: &web::Data<Arc<dyn PageCache>>,
    site: &SiteSettings,
) -> FollowService {
    FollowService::new(store.get_ref().clone(), feed_composer(store, cache, site))
}

fn respond(
    req: &HttpRequest,
    site: &SiteSettings,
    result: Result<(User, FollowOutcome)>,
) -> Result<HttpResponse> {
    match result {
        Ok((author, outcome)) => {
            tracing::debug!(author = %author.username, ?outcome, "follow request handled");
            Ok(redirect(&profile_url(&author.username)))
        }
        Err(AppError::AuthenticationRequired) => Ok(login_redirect(req, site)),
        Err(err) => Err(err),
    }
}

pub async fn profile_follow(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    cache: web::Data<Arc<dyn PageCache>>,
    site: web::Data<SiteSettings>,
    user: CurrentUser,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let result = follow_service(&store, &cache, &site)
        .follow(user.user(), &username)
        .await;
    respond(&req, &site, result)
}

pub async fn profile_unfollow(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    cache: web::Data<Arc<dyn PageCache>>,
    site: web::Data<SiteSettings>,
    user: CurrentUser,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let result = follow_service(&store, &cache, &site)
        .unfollow(user.user(), &username)
        .await;
    respond(&req, &site, result)
}
