//! 注册、登录与 token 刷新

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::WWW_AUTHENTICATE;
use actix_web::{HttpResponse, Responder, Result as ActixResult, web};
use tracing::{info, warn};

use crate::api::jwt::TokenPair;
use crate::errors::MediRemindError;
use crate::services::{SignupRequest, UserService};

use super::error_code::ErrorCode;
use super::helpers::{error_from_app, error_with_code, success_with_message};
use super::types::{ApiResponse, LoginForm, RefreshBody, SignupBody, TokenResponse, UserResponse};

fn token_response(pair: TokenPair) -> TokenResponse {
    TokenResponse {
        access_token: pair.access_token,
        token_type: "bearer".to_string(),
        refresh_token: pair.refresh_token,
        expires_in: pair.expires_in,
    }
}

/// 401 + `WWW-Authenticate: Bearer`
fn bearer_challenge(code: ErrorCode, message: &str) -> HttpResponse {
    HttpResponse::build(StatusCode::UNAUTHORIZED)
        .insert_header((WWW_AUTHENTICATE, "Bearer"))
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse::<()> {
            code: code as i32,
            message: message.to_string(),
            data: None,
        })
}

/// POST /auth/signup
pub async fn signup(
    body: web::Json<SignupBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let body = body.into_inner();
    let request = SignupRequest {
        email: body.email,
        password: body.password,
        full_name: body.full_name,
    };

    match users.signup(request).await {
        Ok(user) => Ok(success_with_message(
            "User created successfully",
            UserResponse::from(user),
        )),
        Err(e @ MediRemindError::Conflict(_)) => {
            Ok(error_with_code(&e, ErrorCode::EmailAlreadyRegistered))
        }
        Err(e) => Ok(error_from_app(&e)),
    }
}

/// POST /auth/token（表单）
pub async fn login(
    form: web::Form<LoginForm>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let user = match users.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(MediRemindError::Authentication(msg)) => {
            warn!("Login failed for {}", form.username);
            return Ok(bearer_challenge(ErrorCode::AuthFailed, &msg));
        }
        Err(e) => return Ok(error_from_app(&e)),
    };

    match users.issue_tokens(&user) {
        Ok(pair) => {
            info!("User {} logged in", user.email);
            Ok(success_with_message("Login successful", token_response(pair)))
        }
        Err(e) => Ok(error_from_app(&e)),
    }
}

/// POST /auth/refresh
pub async fn refresh(
    body: web::Json<RefreshBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    match users.refresh(&body.refresh_token).await {
        Ok(pair) => Ok(success_with_message("Token refreshed", token_response(pair))),
        Err(MediRemindError::Authentication(_)) => Ok(bearer_challenge(
            ErrorCode::TokenInvalid,
            "Invalid refresh token",
        )),
        Err(e) => Ok(error_from_app(&e)),
    }
}
