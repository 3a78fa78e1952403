use actix_web::http::StatusCode;
use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, trace};

use crate::storage::SeaOrmStorage;

use super::error_code::ErrorCode;
use super::helpers::{error_response, json_response, success_response};
use super::types::{HealthResponse, MessageResponse, RootResponse};

pub const APP_NAME: &str = "MediRemind API";

const ROUTERS: [&str; 5] = ["auth", "predictions", "users", "medications", "notifications"];
const PING_TIMEOUT: Duration = Duration::from_secs(5);

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

async fn ping(storage: &SeaOrmStorage) -> Result<(), String> {
    match tokio::time::timeout(PING_TIMEOUT, storage.ping()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("database error: {}", e)),
        Err(_) => Err("timeout".to_string()),
    }
}

/// GET /
pub async fn root() -> ActixResult<impl Responder> {
    Ok(success_response(RootResponse {
        status: "healthy".to_string(),
        app: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// GET /health
pub async fn health_check(
    storage: web::Data<Arc<SeaOrmStorage>>,
    app_start_time: web::Data<AppStartTime>,
) -> ActixResult<impl Responder> {
    let start_time = Instant::now();
    trace!("Received health check request");

    let db_status = ping(&storage).await;
    if let Err(ref e) = db_status {
        error!("Database health check failed: {}", e);
    }

    let now = chrono::Utc::now();
    let healthy = db_status.is_ok();
    let data = HealthResponse {
        status: if healthy { "ok" } else { "unhealthy" }.to_string(),
        database: match db_status {
            Ok(()) => "connected".to_string(),
            Err(e) => e,
        },
        backend: storage.info().backend,
        routers: ROUTERS.iter().map(|r| r.to_string()).collect(),
        timestamp: now.to_rfc3339(),
        uptime: (now - app_start_time.start_datetime).num_seconds().max(0) as u32,
        response_time_ms: start_time.elapsed().as_millis() as u32,
    };

    if healthy {
        Ok(success_response(data))
    } else {
        Ok(json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ServiceUnavailable,
            "Database unreachable",
            Some(data),
        ))
    }
}

/// GET /health/ready
pub async fn readiness_check(
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> ActixResult<impl Responder> {
    match ping(&storage).await {
        Ok(()) => Ok(success_response(MessageResponse::new("ready"))),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            Ok(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ServiceUnavailable,
                "not ready",
            ))
        }
    }
}

/// GET /health/live
pub async fn liveness_check() -> ActixResult<impl Responder> {
    Ok(success_response(MessageResponse::new("alive")))
}
