//! Server mode
//!
//! Starts the HTTP API and, unless disabled, the reminder worker in the
//! same process.

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    http::{Method, header},
    middleware::{Compress, DefaultHeaders},
};
use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::api::middleware::{RateLimiters, RequestTrace};
use crate::api::services::{configure_routes, extractor_config};
use crate::config::{CorsConfig, get_config};
use crate::runtime::lifetime;
use crate::services::ReminderWorker;

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(cors_config: &CorsConfig) {
    if !cors_config.enabled {
        return;
    }

    if cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed."
        );
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");
    if is_any_origin && cors_config.allow_credentials {
        error!(
            "SECURITY WARNING: allow_any_origin + allow_credentials is a dangerous combination! \
            Disabling credentials."
        );
    }
}

/// Build CORS middleware from configuration
pub fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 未启用时保持浏览器默认的同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default();
    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");

    if is_any_origin {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors = cors
        .allowed_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers([header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .max_age(cors_config.max_age as usize);

    // actix-cors 在 any_origin 下会回显 Origin，不能再允许凭据
    if cors_config.allow_credentials && !is_any_origin {
        cors = cors.supports_credentials();
    }

    cors
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup()
        .await
        .inspect_err(|e| error!("Server startup failed: {:#}", e))?;

    let config = get_config();
    let services = startup.services;
    let storage = startup.storage;

    // 限流状态保存在配置里，所有 worker 共用一份
    let limiters = Arc::new(
        RateLimiters::from_config(&config.rate_limit).context("Invalid rate limit config")?,
    );

    let cors_config = config.cors.clone();
    validate_cors_config(&cors_config);

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    let payload_limit = config.server.payload_limit_kb * 1024;
    info!("Using {} worker threads for the HTTP server", cpu_count);

    if config.worker.embedded {
        let worker = ReminderWorker::new(storage.clone(), services.notifiers.clone())
            .with_daily_rollover(config.worker.daily_rollover);
        let interval = Duration::from_secs(config.worker.poll_interval_secs.max(1));
        tokio::spawn(async move {
            worker
                .run(interval, lifetime::shutdown::wait_for_signal())
                .await;
        });
    } else {
        info!("Embedded reminder worker disabled, run `mediremind worker` separately");
    }

    let db_for_shutdown = storage.get_db().clone();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let server = HttpServer::new(move || {
        let services = services.clone();
        let limiters = limiters.clone();

        App::new()
            .wrap(RequestTrace)
            .wrap(build_cors_middleware(&cors_config))
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(|cfg| services.configure(cfg))
            .configure(|cfg| extractor_config(cfg, payload_limit))
            .configure(|cfg| configure_routes(cfg, &limiters))
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .workers(cpu_count)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    warn!("Starting server at http://{}", bind_address);

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{HttpResponse, test, web};

    fn cors(enabled: bool, origins: &[&str]) -> CorsConfig {
        CorsConfig {
            enabled,
            allowed_origins: origins.iter().map(|s| s.to_string()).collect(),
            allow_credentials: true,
            max_age: 600,
        }
    }

    #[actix_web::test]
    async fn test_configured_origin_is_echoed() {
        let app = test::init_service(
            App::new()
                .wrap(build_cors_middleware(&cors(true, &["http://localhost:3000"])))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header((header::ORIGIN, "http://localhost:3000"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
        assert!(
            resp.headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
        );
    }

    #[actix_web::test]
    async fn test_wildcard_origin_drops_credentials() {
        let app = test::init_service(
            App::new()
                .wrap(build_cors_middleware(&cors(true, &["*"])))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header((header::ORIGIN, "https://elsewhere.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert!(
            !resp
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
        );
    }
}
