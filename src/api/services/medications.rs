//! 药品 CRUD

use std::sync::Arc;

use actix_web::{Responder, Result as ActixResult, web};
use tracing::info;

use crate::api::middleware::AuthenticatedUser;
use crate::errors::MediRemindError;
use crate::services::MedicationService;
use crate::storage::ReminderDetail;

use super::error_code::ErrorCode;
use super::helpers::{
    api_result, error_from_app, error_with_code, success_response, success_with_message,
};
use super::types::{
    CreateMedicationBody, MedicationCreatedResponse, MedicationResponse, MessageResponse,
    ReminderResponse, TestTriggerQuery, TestTriggerResponse,
};

fn medication_error(err: &MediRemindError) -> actix_web::HttpResponse {
    match err {
        MediRemindError::NotFound(_) => error_with_code(err, ErrorCode::MedicationNotFound),
        _ => error_from_app(err),
    }
}

/// POST /medications
pub async fn create_medication(
    user: web::ReqData<AuthenticatedUser>,
    body: web::Json<CreateMedicationBody>,
    medications: web::Data<Arc<MedicationService>>,
) -> ActixResult<impl Responder> {
    let (medication, reminders) = match medications
        .create(user.id(), body.into_inner().into())
        .await
    {
        Ok(created) => created,
        Err(e) => return Ok(error_from_app(&e)),
    };

    let reminders = reminders
        .into_iter()
        .map(|reminder| {
            ReminderResponse::from(&ReminderDetail {
                reminder,
                medication: medication.clone(),
            })
        })
        .collect();

    Ok(success_with_message(
        "Medication created successfully",
        MedicationCreatedResponse {
            message: "Medication created successfully".to_string(),
            id: medication.id,
            reminders,
        },
    ))
}

/// GET /medications
pub async fn list_medications(
    user: web::ReqData<AuthenticatedUser>,
    medications: web::Data<Arc<MedicationService>>,
) -> ActixResult<impl Responder> {
    let result = medications.list(user.id()).await.map(|list| {
        list.into_iter()
            .map(MedicationResponse::from)
            .collect::<Vec<_>>()
    });
    Ok(api_result(result))
}

/// GET /medications/{id}
pub async fn get_medication(
    user: web::ReqData<AuthenticatedUser>,
    path: web::Path<i32>,
    medications: web::Data<Arc<MedicationService>>,
) -> ActixResult<impl Responder> {
    match medications.get_owned(user.id(), path.into_inner()).await {
        Ok(medication) => Ok(success_response(MedicationResponse::from(medication))),
        Err(e) => Ok(medication_error(&e)),
    }
}

/// DELETE /medications/{id}
pub async fn delete_medication(
    user: web::ReqData<AuthenticatedUser>,
    path: web::Path<i32>,
    medications: web::Data<Arc<MedicationService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    match medications.delete(user.id(), id).await {
        Ok(()) => {
            info!("Medication {} deleted by user {}", id, user.id());
            Ok(success_response(MessageResponse::new(
                "Medication deleted successfully",
            )))
        }
        Err(e) => Ok(medication_error(&e)),
    }
}

/// POST /medications/test-trigger?minutes=&high_risk=
pub async fn test_trigger(
    user: web::ReqData<AuthenticatedUser>,
    query: web::Query<TestTriggerQuery>,
    medications: web::Data<Arc<MedicationService>>,
) -> ActixResult<impl Responder> {
    let minutes = query.minutes.unwrap_or(0.0);
    let high_risk = query.high_risk.unwrap_or(false);

    match medications
        .create_test_reminder(user.id(), minutes, high_risk)
        .await
    {
        Ok(created) => {
            info!(
                "Created test reminder for {}: {}",
                user.0.email, created.medication.name
            );
            Ok(success_with_message(
                created.message.clone(),
                TestTriggerResponse {
                    message: created.message,
                    medication: created.medication.name,
                    medication_id: created.medication.id,
                    reminder_id: created.reminder.id,
                    scheduled_time: created.reminder.scheduled_time,
                },
            ))
        }
        Err(e) => Ok(error_from_app(&e)),
    }
}
