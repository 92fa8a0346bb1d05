/// Static pages and the not-found document
use actix_web::{HttpRequest, HttpResponse};

pub async fn about_author() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "page": "about/author" }))
}

pub async fn about_tech() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "page": "about/tech" }))
}

/// Fallback for unrouted paths
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    tracing::debug!(path = %req.path(), method = %req.method(), "no route matched");
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "Page not found",
        "status": 404,
        "path": req.path(),
    }))
}
