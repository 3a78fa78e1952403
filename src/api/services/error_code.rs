//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::MediRemindError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 药品 / 提醒错误
/// - 4000-4099: AI 服务错误
/// - 5000-5099: 通知错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    InvalidDateFormat = 1012,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    TokenInvalid = 2002,
    EmailAlreadyRegistered = 2003,

    // 药品 / 提醒错误 3000-3099
    MedicationNotFound = 3000,
    ReminderNotFound = 3001,
    InvalidReminderStatus = 3003,

    // AI 错误 4000-4099
    AiServiceError = 4000,
    AiResponseParseError = 4001,
    AiQuotaExceeded = 4002,
    AiNotConfigured = 4003,
    InvalidImage = 4004,

    // 通知错误 5000-5099
    EmailDeliveryFailed = 5000,
    PushFailed = 5001,
    PushNotConfigured = 5002,
    PushSubscriptionExpired = 5003,
}

impl From<&MediRemindError> for ErrorCode {
    fn from(err: &MediRemindError) -> Self {
        match err {
            MediRemindError::Validation(_) => ErrorCode::BadRequest,
            MediRemindError::DateParse(_) => ErrorCode::InvalidDateFormat,
            MediRemindError::NotFound(_) => ErrorCode::NotFound,
            MediRemindError::Conflict(_) => ErrorCode::Conflict,
            MediRemindError::Authentication(_) => ErrorCode::AuthFailed,
            MediRemindError::Forbidden(_) => ErrorCode::Forbidden,
            MediRemindError::InvalidImage(_) => ErrorCode::InvalidImage,
            MediRemindError::AiService(_) => ErrorCode::AiServiceError,
            MediRemindError::AiResponseParse(_) => ErrorCode::AiResponseParseError,
            MediRemindError::AiQuotaExceeded(_) => ErrorCode::AiQuotaExceeded,
            MediRemindError::NotConfigured(_) | MediRemindError::DatabaseConnection(_) => {
                ErrorCode::ServiceUnavailable
            }
            MediRemindError::EmailDelivery(_) => ErrorCode::EmailDeliveryFailed,
            MediRemindError::PushNotification(_) => ErrorCode::PushFailed,
            MediRemindError::PushSubscriptionExpired(_) => ErrorCode::PushSubscriptionExpired,
            MediRemindError::Config(_)
            | MediRemindError::DatabaseConfig(_)
            | MediRemindError::DatabaseOperation(_)
            | MediRemindError::FileOperation(_)
            | MediRemindError::Serialization(_) => ErrorCode::InternalServerError,
        }
    }
}
