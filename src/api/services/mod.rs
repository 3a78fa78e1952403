pub mod auth;
pub mod error_code;
pub mod health;
pub mod helpers;
pub mod medications;
pub mod notifications;
pub mod predictions;
pub mod reminders;
pub mod routes;
pub mod types;
pub mod users;

pub use error_code::ErrorCode;
pub use health::AppStartTime;
pub use helpers::{
    api_result, error_from_app, error_response, error_with_code, json_response,
    success_response, success_with_message,
};
pub use routes::{configure_routes, extractor_config};
pub use types::*;
