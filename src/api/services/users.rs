//! 当前用户资料与服药历史

use std::sync::Arc;

use actix_web::{Responder, Result as ActixResult, web};
use tracing::trace;

use crate::api::middleware::AuthenticatedUser;
use crate::services::{ReminderService, UserService};

use super::helpers::{api_result, success_response};
use super::types::{ReminderResponse, UserResponse, UserUpdateBody};

/// GET /users/me
pub async fn get_me(user: web::ReqData<AuthenticatedUser>) -> ActixResult<impl Responder> {
    Ok(success_response(UserResponse::from(user.0.clone())))
}

/// PUT /users/me
pub async fn update_me(
    user: web::ReqData<AuthenticatedUser>,
    body: web::Json<UserUpdateBody>,
    users: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let result = users
        .update_profile(user.id(), body.into_inner().into())
        .await
        .map(UserResponse::from);
    Ok(api_result(result))
}

/// GET /users/me/reminders/history（/reminders/history 为旧路径）
pub async fn reminder_history(
    user: web::ReqData<AuthenticatedUser>,
    reminders: web::Data<Arc<ReminderService>>,
) -> ActixResult<impl Responder> {
    trace!("Loading reminder history for user {}", user.id());
    let result = reminders.history(user.id()).await.map(|history| {
        history
            .iter()
            .map(ReminderResponse::from)
            .collect::<Vec<_>>()
    });
    Ok(api_result(result))
}
