use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yatube_service::cache::{MemoryPageCache, PageCache, RedisPageCache};
use yatube_service::config::{CacheBackend, Config, StoreBackend};
use yatube_service::db::{self, MemoryStore, PgStore, Store};
use yatube_service::handlers::{self, SiteSettings};
use yatube_service::middleware::{IdentityMiddleware, JwtKeys};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database).await.map_err(|e| {
                tracing::error!("Database connection failed: {}", e);
                io::Error::new(io::ErrorKind::Other, format!("Database error: {e}"))
            })?;
            let store = PgStore::new(pool);

            if config.database.run_migrations {
                store.migrate().await.map_err(|e| {
                    tracing::error!("Database migrations failed: {}", e);
                    io::Error::new(io::ErrorKind::Other, format!("Migration error: {e}"))
                })?;
                tracing::info!("Database migrations applied");
            }

            Ok(Arc::new(store))
        }
    }
}

async fn build_cache(config: &Config) -> io::Result<Arc<dyn PageCache>> {
    match config.cache.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryPageCache::new())),
        CacheBackend::Redis => {
            let cache = RedisPageCache::connect(&config.cache.url)
                .await
                .map_err(|e| {
                    tracing::error!("Redis connection failed: {}", e);
                    io::Error::new(io::ErrorKind::Other, format!("Redis error: {e}"))
                })?;
            if let Err(e) = cache.ping().await {
                tracing::warn!("Redis PING failed, index cache may be degraded: {}", e);
            }
            Ok(Arc::new(cache))
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Yatube Service
///
/// Blogging platform backend: authors publish posts (optionally in a
/// group, optionally with an image), readers comment and follow authors.
///
/// # Routes
///
/// - `/`, `/group/{slug}/`, `/profile/{username}/`, `/follow/` - feeds
/// - `/posts/{id}/`, `/create/`, `/posts/{id}/edit/`, `/posts/{id}/comment/` - posts
/// - `/profile/{username}/follow/`, `/profile/{username}/unfollow/` - follow graph
/// - `/health`, `/health/ready`, `/metrics` - operations
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Support container healthchecks via CLI subcommand
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" {
                let port = std::env::var("YATUBE_PORT").unwrap_or_else(|_| "8000".to_string());
                let url = format!("http://127.0.0.1:{}/health", port);
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    dotenv::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            return Err(io::Error::new(io::ErrorKind::Other, e));
        }
    };

    tracing::info!(
        env = %config.app.env,
        store = ?config.database.backend,
        cache = ?config.cache.backend,
        posts_in_page = config.feed.posts_in_page,
        "Starting yatube-service"
    );

    let store = build_store(&config).await?;
    let cache = build_cache(&config).await?;
    let keys = Arc::new(JwtKeys::from_secret(&config.auth.jwt_secret));

    let store_data = web::Data::new(store);
    let cache_data = web::Data::new(cache);
    let site_data = web::Data::new(SiteSettings::from_config(&config));
    let allowed_origins = config.cors.allowed_origins.clone();

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Binding HTTP server to {}", bind_address);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(store_data.clone())
            .app_data(cache_data.clone())
            .app_data(site_data.clone())
            .wrap(IdentityMiddleware::new(keys.clone()))
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    server_handle.stop(true).await;

    match server_task.await {
        Ok(result) => result?,
        Err(e) => {
            tracing::error!("Server task join error: {}", e);
            return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
        }
    }

    tracing::info!("yatube-service shut down");
    Ok(())
}
