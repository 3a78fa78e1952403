//! API 类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{MediRemindError, Result};
use crate::services::CreateMedicationRequest;
use crate::storage::{
    Medication, MedicationPriority, ReminderDetail, ReminderStatus, User, UserProfileUpdate,
};
use crate::utils::validation::check_length;

/// 统一响应包装
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============ Auth ============

#[derive(Deserialize, Clone, Debug)]
pub struct SignupBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// OAuth2 password flow 表单（`username` 为邮箱）
#[derive(Deserialize, Clone, Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RefreshBody {
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

// ============ Users ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub is_active: bool,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email_notifications: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            full_name: user.full_name,
            phone_number: user.phone_number,
            email_notifications: user.email_notifications,
            created_at: user.created_at,
        }
    }
}

/// 缺省字段保持不变
#[derive(Deserialize, Clone, Debug, Default)]
pub struct UserUpdateBody {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email_notifications: Option<bool>,
}

impl From<UserUpdateBody> for UserProfileUpdate {
    fn from(body: UserUpdateBody) -> Self {
        Self {
            full_name: body.full_name,
            phone_number: body.phone_number,
            email_notifications: body.email_notifications,
        }
    }
}

// ============ Medications ============

#[derive(Deserialize, Clone, Debug)]
pub struct CreateMedicationBody {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub instructions: Option<String>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub priority: Option<MedicationPriority>,
    pub reminders: Vec<String>,
}

impl From<CreateMedicationBody> for CreateMedicationRequest {
    fn from(body: CreateMedicationBody) -> Self {
        Self {
            name: body.name,
            dosage: body.dosage,
            frequency: body.frequency,
            instructions: body.instructions,
            start_date: body.start_date,
            end_date: body.end_date,
            priority: body.priority,
            reminders: body.reminders,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MedicationCreatedResponse {
    pub message: String,
    pub id: i32,
    pub reminders: Vec<ReminderResponse>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MedicationResponse {
    pub id: i32,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub priority: MedicationPriority,
}

impl From<Medication> for MedicationResponse {
    fn from(med: Medication) -> Self {
        Self {
            id: med.id,
            name: med.name,
            dosage: med.dosage,
            frequency: med.frequency,
            instructions: med.instructions,
            start_date: med.start_date,
            end_date: med.end_date,
            priority: med.priority,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct TestTriggerQuery {
    #[serde(default)]
    pub minutes: Option<f64>,
    #[serde(default)]
    pub high_risk: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TestTriggerResponse {
    pub message: String,
    pub medication: String,
    pub medication_id: i32,
    pub reminder_id: i32,
    pub scheduled_time: DateTime<Utc>,
}

// ============ Reminders ============

#[derive(Deserialize, Clone, Debug)]
pub struct ReminderStatusBody {
    pub status: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ReminderListQuery {
    pub status: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReminderResponse {
    pub id: i32,
    pub medication_id: i32,
    pub medication_name: String,
    pub dosage: String,
    pub scheduled_time: DateTime<Utc>,
    pub status: ReminderStatus,
}

impl From<&ReminderDetail> for ReminderResponse {
    fn from(detail: &ReminderDetail) -> Self {
        Self {
            id: detail.reminder.id,
            medication_id: detail.reminder.medication_id,
            medication_name: detail.medication.name.clone(),
            dosage: detail.medication.dosage.clone(),
            scheduled_time: detail.reminder.scheduled_time,
            status: detail.reminder.status,
        }
    }
}

// ============ Notifications ============

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StreamQuery {
    pub token: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SubscribeBody {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl SubscribeBody {
    pub fn validate(&self) -> Result<()> {
        check_length("endpoint", &self.endpoint, 10, 2000)?;
        let url = url::Url::parse(&self.endpoint)
            .map_err(|_| MediRemindError::validation("endpoint must be a valid URL"))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(MediRemindError::validation(
                "endpoint must be an http(s) URL",
            ));
        }
        if self.keys.p256dh.trim().is_empty() || self.keys.auth.trim().is_empty() {
            return Err(MediRemindError::validation(
                "Subscription keys must include 'p256dh' and 'auth'",
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct UnsubscribeQuery {
    pub endpoint: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VapidKeyResponse {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

// ============ Predictions ============

#[derive(Deserialize, Clone, Debug)]
pub struct ImageBody {
    pub image: String,
}

// ============ Health ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RootResponse {
    pub status: String,
    pub app: String,
    pub version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub backend: String,
    pub routers: Vec<String>,
    pub timestamp: String,
    pub uptime: u32,
    pub response_time_ms: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribe(endpoint: &str, p256dh: &str) -> SubscribeBody {
        SubscribeBody {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: "auth-secret".into(),
            },
        }
    }

    #[test]
    fn test_subscribe_validation() {
        assert!(subscribe("https://fcm.googleapis.com/fcm/send/abc", "BKey").validate().is_ok());
        assert!(subscribe("short", "BKey").validate().is_err());
        assert!(subscribe("ftp://push.example.com/x", "BKey").validate().is_err());
        assert!(subscribe("https://fcm.googleapis.com/fcm/send/abc", "").validate().is_err());
    }

    #[test]
    fn test_vapid_key_response_field_name() {
        let json = serde_json::to_value(VapidKeyResponse {
            public_key: "BAbc".into(),
        })
        .unwrap();
        assert_eq!(json["publicKey"], "BAbc");
    }

    #[test]
    fn test_user_update_body_partial() {
        let body: UserUpdateBody =
            serde_json::from_str(r#"{"email_notifications": true}"#).unwrap();
        let update = UserProfileUpdate::from(body);
        assert_eq!(update.email_notifications, Some(true));
        assert!(update.full_name.is_none());
    }

    #[test]
    fn test_create_medication_body_defaults() {
        let body: CreateMedicationBody = serde_json::from_str(
            r#"{"name":"Aspirin","dosage":"75mg","frequency":"Daily","start_date":"2025-01-01","reminders":["08:00"]}"#,
        )
        .unwrap();
        assert!(body.instructions.is_none());
        assert!(body.priority.is_none());
        let req = CreateMedicationRequest::from(body);
        assert_eq!(req.reminders, vec!["08:00".to_string()]);
    }
}
