use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{
        Method,
        header::{CONTENT_TYPE, WWW_AUTHENTICATE},
    },
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{error, info, trace};

use crate::api::jwt::get_jwt_service;
use crate::api::services::{ApiResponse, ErrorCode};
use crate::storage::{SeaOrmStorage, User};

/// 已认证用户，由 [`UserAuth`] 写入 request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

/// 校验 access token 并解析为活跃用户
///
/// SSE 端点通过 query 传 token，也走这里。
pub async fn resolve_token_user(storage: &SeaOrmStorage, token: &str) -> Option<User> {
    let claims = match get_jwt_service().validate_access_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            info!("Bearer token validation failed: {}", e);
            return None;
        }
    };

    match storage.find_user_by_email(&claims.sub).await {
        Ok(Some(user)) if user.is_active => Some(user),
        Ok(_) => {
            info!("Token subject {} is not an active user", claims.sub);
            None
        }
        Err(e) => {
            error!("User lookup failed during authentication: {}", e);
            None
        }
    }
}

/// Bearer token authentication middleware
///
/// Resolves the token subject to an active user row; handlers read it with
/// `web::ReqData<AuthenticatedUser>`.
#[derive(Clone, Default)]
pub struct UserAuth;

impl<S, B> Transform<S, ServiceRequest> for UserAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = UserAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(UserAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct UserAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> UserAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_unauthorized(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        req.into_response(
            HttpResponse::Unauthorized()
                .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
                .insert_header((WWW_AUTHENTICATE, "Bearer"))
                .json(ApiResponse::<()> {
                    code: ErrorCode::Unauthorized as i32,
                    message: "Could not validate credentials".to_string(),
                    data: None,
                })
                .map_into_right_body(),
        )
    }

    fn handle_storage_missing(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        error!("Storage not registered as app data, cannot authenticate");
        req.into_response(
            HttpResponse::ServiceUnavailable()
                .json(ApiResponse::<()> {
                    code: ErrorCode::ServiceUnavailable as i32,
                    message: "Service unavailable".to_string(),
                    data: None,
                })
                .map_into_right_body(),
        )
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| {
                s.strip_prefix("Bearer ")
                    .or_else(|| s.strip_prefix("bearer "))
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl<S, B> Service<ServiceRequest> for UserAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            // CORS preflight 交给 Cors 中间件
            if req.method() == Method::OPTIONS {
                return Ok(srv.call(req).await?.map_into_left_body());
            }

            let Some(token) = Self::extract_bearer_token(&req) else {
                trace!("Missing bearer token for {}", req.path());
                return Ok(Self::handle_unauthorized(req));
            };

            let Some(storage) = req.app_data::<web::Data<Arc<SeaOrmStorage>>>().cloned() else {
                return Ok(Self::handle_storage_missing(req));
            };

            let Some(user) = resolve_token_user(&storage, &token).await else {
                return Ok(Self::handle_unauthorized(req));
            };

            trace!("Authenticated user {} for {}", user.id, req.path());
            req.extensions_mut().insert(AuthenticatedUser(user));
            Ok(srv.call(req).await?.map_into_left_body())
        })
    }
}
