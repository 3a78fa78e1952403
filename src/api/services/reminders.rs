//! 提醒状态与列表

use std::str::FromStr;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{Responder, Result as ActixResult, web};

use crate::api::middleware::AuthenticatedUser;
use crate::errors::MediRemindError;
use crate::services::ReminderService;
use crate::storage::ReminderStatus;

use super::error_code::ErrorCode;
use super::helpers::{api_result, error_from_app, error_response, error_with_code, success_response};
use super::types::{ReminderListQuery, ReminderResponse, ReminderStatusBody};

fn parse_status(value: &str) -> Option<ReminderStatus> {
    ReminderStatus::from_str(value.trim()).ok()
}

/// PUT /reminders/{id}/status
pub async fn update_status(
    user: web::ReqData<AuthenticatedUser>,
    path: web::Path<i32>,
    body: web::Json<ReminderStatusBody>,
    reminders: web::Data<Arc<ReminderService>>,
) -> ActixResult<impl Responder> {
    let Some(status) = parse_status(&body.status).filter(|s| s.is_resolved()) else {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidReminderStatus,
            "status must be TAKEN or SKIPPED",
        ));
    };

    match reminders.update_status(user.id(), path.into_inner(), status).await {
        Ok(detail) => Ok(success_response(ReminderResponse::from(&detail))),
        Err(e @ MediRemindError::NotFound(_)) => {
            Ok(error_with_code(&e, ErrorCode::ReminderNotFound))
        }
        Err(e) => Ok(error_from_app(&e)),
    }
}

/// GET /reminders?status=
pub async fn list_reminders(
    user: web::ReqData<AuthenticatedUser>,
    query: web::Query<ReminderListQuery>,
    reminders: web::Data<Arc<ReminderService>>,
) -> ActixResult<impl Responder> {
    let status = match query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        None => None,
        Some(raw) => match parse_status(raw) {
            Some(status) => Some(status),
            None => {
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::InvalidReminderStatus,
                    &format!("Unknown reminder status: {}", raw),
                ));
            }
        },
    };

    let result = reminders.list(user.id(), status).await.map(|list| {
        list.iter()
            .map(ReminderResponse::from)
            .collect::<Vec<_>>()
    });
    Ok(api_result(result))
}
