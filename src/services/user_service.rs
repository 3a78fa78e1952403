//! 用户注册、登录与个人资料

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::jwt::{TokenPair, get_jwt_service};
use crate::errors::{MediRemindError, Result};
use crate::storage::{SeaOrmStorage, User, UserProfileUpdate};
use crate::utils::password::{hash_password, verify_against_dummy, verify_password};
use crate::utils::validation::{check_length, normalize_email};

pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_FULL_NAME_LEN: usize = 100;
const INVALID_LOGIN: &str = "Incorrect email or password";

/// Registration input
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

pub struct UserService {
    storage: Arc<SeaOrmStorage>,
}

impl UserService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<User> {
        let email = normalize_email(&req.email)?;
        check_length("password", &req.password, 1, MAX_PASSWORD_LEN)?;

        let full_name = req
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(name) = full_name {
            check_length("full_name", name, 1, MAX_FULL_NAME_LEN)?;
        }

        let hashed = hash_password(&req.password)?;
        let user = self
            .storage
            .create_user_with_name(&email, &hashed, full_name)
            .await?;

        info!("New user registered: {}", user.email);
        Ok(user)
    }

    /// 校验邮箱和密码，失败统一返回同一条消息
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let Ok(email) = normalize_email(email) else {
            verify_against_dummy(password);
            return Err(MediRemindError::authentication(INVALID_LOGIN));
        };

        let Some(user) = self.storage.find_user_by_email(&email).await? else {
            verify_against_dummy(password);
            warn!("Authentication failed: user not found for {}", email);
            return Err(MediRemindError::authentication(INVALID_LOGIN));
        };

        if !verify_password(password, &user.hashed_password) {
            warn!("Authentication failed: invalid password for {}", email);
            return Err(MediRemindError::authentication(INVALID_LOGIN));
        }

        if !user.is_active {
            warn!("Authentication failed: inactive account {}", email);
            return Err(MediRemindError::authentication(INVALID_LOGIN));
        }

        info!("User authenticated successfully: {}", email);
        Ok(user)
    }

    pub fn issue_tokens(&self, user: &User) -> Result<TokenPair> {
        Ok(get_jwt_service().generate_pair(&user.email)?)
    }

    /// 用 refresh token 换新的 token 对
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = get_jwt_service()
            .validate_refresh_token(refresh_token)
            .map_err(|_| MediRemindError::authentication("Invalid refresh token"))?;

        match self.storage.find_user_by_email(&claims.sub).await? {
            Some(user) if user.is_active => self.issue_tokens(&user),
            _ => Err(MediRemindError::authentication("Invalid refresh token")),
        }
    }

    pub async fn update_profile(&self, user_id: i32, update: UserProfileUpdate) -> Result<User> {
        if let Some(ref name) = update.full_name {
            check_length("full_name", name, 0, MAX_FULL_NAME_LEN)?;
        }
        if let Some(ref phone) = update.phone_number {
            check_length("phone_number", phone, 0, 20)?;
        }

        let user = self.storage.update_user_profile(user_id, update).await?;
        info!("Updated profile for {}", user.email);
        Ok(user)
    }
}
