/// Feed handlers - index, group, profile and followed-authors pages
use super::{feed_composer, login_redirect, SiteSettings};
use crate::cache::PageCache;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::PageRequest;
use crate::services::FollowService;
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;

/// Global feed; served from the page cache while fresh
pub async fn index(
    store: web::Data<Arc<dyn Store>>,
    cache: web::Data<Arc<dyn PageCache>>,
    site: web::Data<SiteSettings>,
    query: web::Query<PageRequest>,
) -> Result<HttpResponse> {
    let snapshot = feed_composer(&store, &cache, &site)
        .index_snapshot(query.number())
        .await?;

    Ok(HttpResponse::Ok()
        .content_type(snapshot.content_type)
        .body(snapshot.body))
}

pub async fn group_posts(
    store: web::Data<Arc<dyn Store>>,
    cache: web::Data<Arc<dyn PageCache>>,
    site: web::Data<SiteSettings>,
    slug: web::Path<String>,
    query: web::Query<PageRequest>,
) -> Result<HttpResponse> {
    let view = feed_composer(&store, &cache, &site)
        .group(&slug, query.number())
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn profile(
    store: web::Data<Arc<dyn Store>>,
    cache: web::Data<Arc<dyn PageCache>>,
    site: web::Data<SiteSettings>,
    username: web::Path<String>,
    query: web::Query<PageRequest>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    let view = feed_composer(&store, &cache, &site)
        .profile(&username, query.number(), user.user())
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Posts of the authors the caller follows
pub async fn follow_index(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
    cache: web::Data<Arc<dyn PageCache>>,
    site: web::Data<SiteSettings>,
    query: web::Query<PageRequest>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    let service = FollowService::new(
        store.get_ref().clone(),
        feed_composer(&store, &cache, &site),
    );

    match service.feed_for(user.user(), query.number()).await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(AppError::AuthenticationRequired) => Ok(login_redirect(&req, &site)),
        Err(err) => Err(err),
    }
}
