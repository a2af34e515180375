//! Fleetdesk backend server
//!
//! Reservation workflow and fleet reporting API for rental agencies.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use fleetdesk_api::{configure_routes, ApiSettings};
use fleetdesk_auth::JwtService;
use fleetdesk_cache::RedisCache;
use fleetdesk_core::config::LoggingConfig;
use fleetdesk_core::AppConfig;
use fleetdesk_db::{create_pool, run_migrations};
use fleetdesk_services::StripeGateway;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing(logging: &LoggingConfig) {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fleetdesk={0},fleetdesk_api={0},fleetdesk_services={0},fleetdesk_db={0},\
             fleetdesk_cache={0},fleetdesk_auth={0},actix_web=info,sqlx=warn",
            log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.is_json() {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn json_error(kind: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": kind,
        "message": message,
        "status": 400,
    }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);
    config.validate().context("invalid configuration")?;

    info!("Starting Fleetdesk v{}", env!("CARGO_PKG_VERSION"));

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .context("failed to create database pool")?;
    if config.database.run_migrations {
        run_migrations(&pool).await.context("failed to run migrations")?;
    }

    let cache = Arc::new(
        RedisCache::new(&config.redis.url)
            .await
            .context("failed to connect to Redis")?,
    );

    let jwt_service = Arc::new(JwtService::from_config(&config.auth));
    info!(
        "JWT service configured with {} second token expiration",
        config.auth.jwt_expiration_secs
    );

    let gateway = match StripeGateway::new(&config.payments) {
        Ok(gateway) => Some(Arc::new(gateway)),
        Err(e) => {
            warn!("Card payments disabled: {}", e);
            None
        }
    };

    let settings = ApiSettings::from_config(&config).context("invalid reporting settings")?;
    info!("Reports bucket by calendar days in {}", settings.tz);

    let cors_origins = config.server.cors_origins.clone();
    let bind_addr = config.server_addr();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|o| cors_origins_inner.split(',').any(|allowed| allowed.trim() == o))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::COOKIE,
            ])
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::new(cache.clone()))
            .app_data(web::Data::new(settings.clone()));
        if let Some(gateway) = &gateway {
            app = app.app_data(web::Data::new(gateway.clone()));
        }

        app.app_data(web::QueryConfig::default().error_handler(|err, _req| {
            let message = err.to_string();
            actix_web::error::InternalError::from_response(err, json_error("invalid_query", message))
                .into()
        }))
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            let message = err.to_string();
            actix_web::error::InternalError::from_response(err, json_error("invalid_body", message))
                .into()
        }))
        .app_data(web::PathConfig::default().error_handler(|err, _req| {
            let message = err.to_string();
            actix_web::error::InternalError::from_response(err, json_error("invalid_path", message))
                .into()
        }))
        .wrap(cors)
        .wrap(TracingLogger::default())
        .wrap(middleware::Compress::default())
        .wrap(middleware::NormalizePath::trim())
        .configure(configure_routes)
        .route(
            "/",
            web::get().to(|| async {
                HttpResponse::Found()
                    .append_header(("Location", "/api/v1/health"))
                    .finish()
            }),
        )
    })
    .workers(config.server.workers)
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
