//! API 路由配置

use actix_web::dev::HttpServiceFactory;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web;

use crate::api::middleware::{RateLimiters, UserAuth};

use super::error_code::ErrorCode;
use super::helpers::error_response;

use super::{auth, health, medications, notifications, predictions, reminders, users};

/// 认证路由 `/auth`
///
/// - POST /auth/signup
/// - POST /auth/token（登录，带限流）
/// - POST /auth/refresh
pub fn auth_routes(limiters: &RateLimiters) -> actix_web::Scope {
    web::scope("/auth")
        .route("/signup", web::post().to(auth::signup))
        .route(
            "/token",
            web::post().to(auth::login).wrap(limiters.login()),
        )
        .route("/refresh", web::post().to(auth::refresh))
}

/// 用户路由 `/users`
pub fn users_routes() -> impl HttpServiceFactory {
    web::scope("/users")
        .wrap(UserAuth)
        .route("/me", web::get().to(users::get_me))
        .route("/me", web::put().to(users::update_me))
        .route("/me/reminders/history", web::get().to(users::reminder_history))
}

/// 药品路由 `/medications`
pub fn medications_routes() -> impl HttpServiceFactory {
    web::scope("/medications")
        .wrap(UserAuth)
        .route("", web::get().to(medications::list_medications))
        .route("", web::post().to(medications::create_medication))
        // 必须在 /{id} 之前
        .route("/test-trigger", web::post().to(medications::test_trigger))
        .route("/{id}", web::get().to(medications::get_medication))
        .route("/{id}", web::delete().to(medications::delete_medication))
}

/// 提醒路由 `/reminders`
pub fn reminders_routes() -> impl HttpServiceFactory {
    web::scope("/reminders")
        .wrap(UserAuth)
        .route("", web::get().to(reminders::list_reminders))
        .route("/history", web::get().to(users::reminder_history))
        .route("/{id}/status", web::put().to(reminders::update_status))
}

/// 通知路由：SSE 用 query token 自行鉴权，其余走 Bearer
pub fn notification_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/notifications/stream",
        web::get().to(notifications::notification_stream),
    )
    .route(
        "/vapid-public-key",
        web::get().to(notifications::vapid_public_key),
    )
    .service(
        web::resource("/subscribe")
            .wrap(UserAuth)
            .route(web::post().to(notifications::subscribe))
            .route(web::delete().to(notifications::unsubscribe)),
    );
}

/// AI 路由：处方识别与风险评估，各自按 IP 限流
pub fn prediction_routes(cfg: &mut web::ServiceConfig, limiters: &RateLimiters) {
    cfg.service(
        web::resource("/process-medication")
            .wrap(limiters.ocr())
            .wrap(UserAuth)
            .route(web::post().to(predictions::process_medication)),
    )
    .service(
        web::resource("/predict-risk")
            .wrap(limiters.risk())
            .wrap(UserAuth)
            .route(web::post().to(predictions::predict_risk)),
    );
}

/// 健康检查路由
pub fn health_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health::root)).service(
        web::scope("/health")
            .route("", web::get().to(health::health_check))
            .route("/ready", web::get().to(health::readiness_check))
            .route("/live", web::get().to(health::liveness_check)),
    );
}

fn bad_request(err: impl std::fmt::Display + std::fmt::Debug + 'static) -> actix_web::Error {
    let message = err.to_string();
    InternalError::from_response(
        err,
        error_response(StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::BadRequest, &message),
    )
    .into()
}

/// 请求体 / query / path 解析失败时返回统一 JSON 错误
pub fn extractor_config(cfg: &mut web::ServiceConfig, payload_limit_bytes: usize) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(payload_limit_bytes)
            .error_handler(|err, _req| bad_request(err)),
    )
    .app_data(web::FormConfig::default().error_handler(|err, _req| bad_request(err)))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| bad_request(err)))
    .app_data(web::PathConfig::default().error_handler(|err, _req| bad_request(err)));
}

/// 挂载全部 API 路由
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RateLimiters) {
    health_routes(cfg);
    cfg.service(auth_routes(limiters))
        .service(users_routes())
        .service(medications_routes())
        .service(reminders_routes());
    notification_routes(cfg);
    prediction_routes(cfg, limiters);
}
