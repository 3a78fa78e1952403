use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum MediRemindError {
    Config(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Serialization(String),
    DateParse(String),
    Authentication(String),
    Forbidden(String),
    InvalidImage(String),
    AiService(String),
    AiResponseParse(String),
    AiQuotaExceeded(String),
    NotConfigured(String),
    EmailDelivery(String),
    PushNotification(String),
    PushSubscriptionExpired(String),
}

impl MediRemindError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            MediRemindError::Config(_) => "E001",
            MediRemindError::DatabaseConfig(_) => "E002",
            MediRemindError::DatabaseConnection(_) => "E003",
            MediRemindError::DatabaseOperation(_) => "E004",
            MediRemindError::FileOperation(_) => "E005",
            MediRemindError::Validation(_) => "E006",
            MediRemindError::NotFound(_) => "E007",
            MediRemindError::Conflict(_) => "E008",
            MediRemindError::Serialization(_) => "E009",
            MediRemindError::DateParse(_) => "E010",
            MediRemindError::Authentication(_) => "E011",
            MediRemindError::Forbidden(_) => "E012",
            MediRemindError::InvalidImage(_) => "E013",
            MediRemindError::AiService(_) => "E014",
            MediRemindError::AiResponseParse(_) => "E015",
            MediRemindError::AiQuotaExceeded(_) => "E016",
            MediRemindError::NotConfigured(_) => "E017",
            MediRemindError::EmailDelivery(_) => "E018",
            MediRemindError::PushNotification(_) => "E019",
            MediRemindError::PushSubscriptionExpired(_) => "E020",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            MediRemindError::Config(_) => "Configuration Error",
            MediRemindError::DatabaseConfig(_) => "Database Configuration Error",
            MediRemindError::DatabaseConnection(_) => "Database Connection Error",
            MediRemindError::DatabaseOperation(_) => "Database Operation Error",
            MediRemindError::FileOperation(_) => "File Operation Error",
            MediRemindError::Validation(_) => "Validation Error",
            MediRemindError::NotFound(_) => "Resource Not Found",
            MediRemindError::Conflict(_) => "Duplicate Record",
            MediRemindError::Serialization(_) => "Serialization Error",
            MediRemindError::DateParse(_) => "Date Parse Error",
            MediRemindError::Authentication(_) => "Authentication Error",
            MediRemindError::Forbidden(_) => "Access Denied",
            MediRemindError::InvalidImage(_) => "Invalid Image",
            MediRemindError::AiService(_) => "AI Service Error",
            MediRemindError::AiResponseParse(_) => "AI Response Parse Error",
            MediRemindError::AiQuotaExceeded(_) => "AI Quota Exceeded",
            MediRemindError::NotConfigured(_) => "Service Not Configured",
            MediRemindError::EmailDelivery(_) => "Email Delivery Error",
            MediRemindError::PushNotification(_) => "Push Notification Error",
            MediRemindError::PushSubscriptionExpired(_) => "Push Subscription Expired",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            MediRemindError::Config(msg)
            | MediRemindError::DatabaseConfig(msg)
            | MediRemindError::DatabaseConnection(msg)
            | MediRemindError::DatabaseOperation(msg)
            | MediRemindError::FileOperation(msg)
            | MediRemindError::Validation(msg)
            | MediRemindError::NotFound(msg)
            | MediRemindError::Conflict(msg)
            | MediRemindError::Serialization(msg)
            | MediRemindError::DateParse(msg)
            | MediRemindError::Authentication(msg)
            | MediRemindError::Forbidden(msg)
            | MediRemindError::InvalidImage(msg)
            | MediRemindError::AiService(msg)
            | MediRemindError::AiResponseParse(msg)
            | MediRemindError::AiQuotaExceeded(msg)
            | MediRemindError::NotConfigured(msg)
            | MediRemindError::EmailDelivery(msg)
            | MediRemindError::PushNotification(msg)
            | MediRemindError::PushSubscriptionExpired(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            MediRemindError::Validation(_)
            | MediRemindError::DateParse(_)
            | MediRemindError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            MediRemindError::Authentication(_) => StatusCode::UNAUTHORIZED,
            MediRemindError::Forbidden(_) => StatusCode::FORBIDDEN,
            MediRemindError::NotFound(_) => StatusCode::NOT_FOUND,
            MediRemindError::Conflict(_) => StatusCode::CONFLICT,
            MediRemindError::AiQuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            MediRemindError::AiService(_) | MediRemindError::PushNotification(_) => {
                StatusCode::BAD_GATEWAY
            }
            MediRemindError::NotConfigured(_) | MediRemindError::DatabaseConnection(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            MediRemindError::PushSubscriptionExpired(_) => StatusCode::GONE,
            MediRemindError::Config(_)
            | MediRemindError::DatabaseConfig(_)
            | MediRemindError::DatabaseOperation(_)
            | MediRemindError::FileOperation(_)
            | MediRemindError::Serialization(_)
            | MediRemindError::AiResponseParse(_)
            | MediRemindError::EmailDelivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for MediRemindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MediRemindError {}

// 便捷的构造函数
impl MediRemindError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        MediRemindError::Config(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        MediRemindError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        MediRemindError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        MediRemindError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        MediRemindError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        MediRemindError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        MediRemindError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        MediRemindError::Conflict(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        MediRemindError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        MediRemindError::DateParse(msg.into())
    }

    pub fn authentication<T: Into<String>>(msg: T) -> Self {
        MediRemindError::Authentication(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        MediRemindError::Forbidden(msg.into())
    }

    pub fn invalid_image<T: Into<String>>(msg: T) -> Self {
        MediRemindError::InvalidImage(msg.into())
    }

    pub fn ai_service<T: Into<String>>(msg: T) -> Self {
        MediRemindError::AiService(msg.into())
    }

    pub fn ai_response_parse<T: Into<String>>(msg: T) -> Self {
        MediRemindError::AiResponseParse(msg.into())
    }

    pub fn ai_quota_exceeded<T: Into<String>>(msg: T) -> Self {
        MediRemindError::AiQuotaExceeded(msg.into())
    }

    pub fn not_configured<T: Into<String>>(msg: T) -> Self {
        MediRemindError::NotConfigured(msg.into())
    }

    pub fn email_delivery<T: Into<String>>(msg: T) -> Self {
        MediRemindError::EmailDelivery(msg.into())
    }

    pub fn push_notification<T: Into<String>>(msg: T) -> Self {
        MediRemindError::PushNotification(msg.into())
    }

    pub fn push_subscription_expired<T: Into<String>>(msg: T) -> Self {
        MediRemindError::PushSubscriptionExpired(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for MediRemindError {
    fn from(err: sea_orm::DbErr) -> Self {
        MediRemindError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for MediRemindError {
    fn from(err: std::io::Error) -> Self {
        MediRemindError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for MediRemindError {
    fn from(err: serde_json::Error) -> Self {
        MediRemindError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for MediRemindError {
    fn from(err: chrono::ParseError) -> Self {
        MediRemindError::DateParse(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for MediRemindError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        MediRemindError::Authentication(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MediRemindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            MediRemindError::config(""),
            MediRemindError::database_config(""),
            MediRemindError::database_connection(""),
            MediRemindError::database_operation(""),
            MediRemindError::file_operation(""),
            MediRemindError::validation(""),
            MediRemindError::not_found(""),
            MediRemindError::conflict(""),
            MediRemindError::serialization(""),
            MediRemindError::date_parse(""),
            MediRemindError::authentication(""),
            MediRemindError::forbidden(""),
            MediRemindError::invalid_image(""),
            MediRemindError::ai_service(""),
            MediRemindError::ai_response_parse(""),
            MediRemindError::ai_quota_exceeded(""),
            MediRemindError::not_configured(""),
            MediRemindError::email_delivery(""),
            MediRemindError::push_notification(""),
            MediRemindError::push_subscription_expired(""),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            MediRemindError::validation("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MediRemindError::authentication("x").http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            MediRemindError::conflict("x").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            MediRemindError::not_configured("x").http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            MediRemindError::ai_response_parse("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = MediRemindError::not_found("Medication 7 not found");
        assert_eq!(
            err.to_string(),
            "Resource Not Found: Medication 7 not found"
        );
    }
}
