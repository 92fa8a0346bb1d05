/// Liveness and readiness checks
use crate::db::Store;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    latency_ms: u64,
    timestamp: String,
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "yatube-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn readiness(store: web::Data<Arc<dyn Store>>) -> HttpResponse {
    let start = Instant::now();
    let result = store.health_check().await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let timestamp = chrono::Utc::now().to_rfc3339();

    match result {
        Ok(()) => HttpResponse::Ok().json(ReadinessResponse {
            ready: true,
            store: "healthy",
            error: None,
            latency_ms,
            timestamp,
        }),
        Err(err) => {
            tracing::warn!("store readiness check failed: {}", err);
            HttpResponse::ServiceUnavailable().json(ReadinessResponse {
                ready: false,
                store: "unhealthy",
                error: Some(err.to_string()),
                latency_ms,
                timestamp,
            })
        }
    }
}
