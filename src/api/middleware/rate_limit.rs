//! 按客户端 IP 的限流器
//!
//! 登录、OCR 和风险评估各自独立计数，额度来自 `rate_limit` 配置（每分钟次数）。
//! 配置在启动时构建一次，所有 worker 共享同一个计数器。

use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError,
};
use actix_web::dev::ServiceRequest;
use governor::middleware::NoOpMiddleware;
use tracing::debug;

use crate::config::{RateLimitConfig, get_config};
use crate::errors::{MediRemindError, Result};
use crate::utils::ip::resolve_client_ip;

/// 限流 key 提取器
///
/// 默认使用连接 IP（无法伪造），仅当连接来自可信代理时使用 X-Forwarded-For。
#[derive(Clone, Copy, Default)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> std::result::Result<Self::Key, Self::KeyExtractionError> {
        let conn_info = req.connection_info();
        let config = get_config();

        resolve_client_ip(
            conn_info.peer_addr(),
            req.headers(),
            &config.rate_limit.trusted_proxies,
        )
        .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract client IP"))
    }
}

pub type IpRateLimiter = Governor<ClientIpKeyExtractor, NoOpMiddleware>;
type IpGovernorConfig = GovernorConfig<ClientIpKeyExtractor, NoOpMiddleware>;

/// 每分钟 `per_minute` 次：令牌每 60/per_minute 秒补充一个，突发上限 per_minute
fn per_minute_config(name: &str, per_minute: u32) -> Result<IpGovernorConfig> {
    let per_minute = per_minute.max(1);
    let replenish_ms = (60_000 / u64::from(per_minute)).max(1);

    let config = GovernorConfigBuilder::default()
        .milliseconds_per_request(replenish_ms)
        .burst_size(per_minute)
        .key_extractor(ClientIpKeyExtractor)
        .finish()
        .ok_or_else(|| MediRemindError::config(format!("Invalid {} rate limit", name)))?;

    debug!("{} rate limiter created: {}/min", name, per_minute);
    Ok(config)
}

/// 三个端点组的限流配置
pub struct RateLimiters {
    login: IpGovernorConfig,
    ocr: IpGovernorConfig,
    risk: IpGovernorConfig,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Ok(Self {
            login: per_minute_config("login", config.login_per_minute)?,
            ocr: per_minute_config("ocr", config.ocr_per_minute)?,
            risk: per_minute_config("risk", config.risk_per_minute)?,
        })
    }

    pub fn login(&self) -> IpRateLimiter {
        Governor::new(&self.login)
    }

    pub fn ocr(&self) -> IpRateLimiter {
        Governor::new(&self.ocr)
    }

    pub fn risk(&self) -> IpRateLimiter {
        Governor::new(&self.risk)
    }
}
