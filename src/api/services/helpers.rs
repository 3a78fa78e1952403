//! API 帮助函数

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::errors::MediRemindError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 带自定义消息的成功响应
pub fn success_with_message<T: Serialize>(message: impl Into<String>, data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, message, Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 MediRemindError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
///
/// 5xx 的内部细节只写日志，不回传客户端。
pub fn error_from_app(err: &MediRemindError) -> HttpResponse {
    let status = err.http_status();
    let error_code = ErrorCode::from(err);

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", err);
        let message = match err {
            MediRemindError::AiResponseParse(msg) => msg.as_str(),
            _ => "Internal server error",
        };
        return error_response(status, error_code, message);
    }

    error_response(status, error_code, err.message())
}

/// 同 [`error_from_app`]，但使用调用方指定的业务错误码
pub fn error_with_code(err: &MediRemindError, code: ErrorCode) -> HttpResponse {
    if err.http_status() == StatusCode::INTERNAL_SERVER_ERROR {
        return error_from_app(err);
    }
    error_response(err.http_status(), code, err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<MediRemindError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => {
            let err: MediRemindError = e.into();
            error_from_app(&err)
        }
    }
}
