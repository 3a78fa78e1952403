//! Notification channels
//!
//! worker 只依赖这里的两个 trait；未配置 SMTP / VAPID 时使用只写日志的实现。

mod email;
mod push;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::storage::PushSubscription;

pub use email::{LogEmailSender, SmtpEmailSender, build_email_sender};
pub use push::{
    GeneratedVapidKeys, LogPushSender, VapidKeys, WebPushSender, build_push_sender, encrypt_payload,
    generate_vapid_keys,
};

pub const DEFAULT_PUSH_ICON: &str = "/icons/pill-icon.png";
pub const DEFAULT_PUSH_BADGE: &str = "/icons/badge.png";
pub const DEFAULT_PUSH_TAG: &str = "medication-reminder";

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Web Push 通知内容
#[derive(Debug, Clone, Default)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub tag: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    title: &'a str,
    body: &'a str,
    icon: &'a str,
    badge: &'a str,
    tag: &'a str,
    data: PushPayloadData<'a>,
}

#[derive(Debug, Serialize)]
struct PushPayloadData<'a> {
    url: &'a str,
}

impl PushMessage {
    /// 浏览器 service worker 收到的 JSON
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let payload = PushPayload {
            title: &self.title,
            body: &self.body,
            icon: self.icon.as_deref().unwrap_or(DEFAULT_PUSH_ICON),
            badge: DEFAULT_PUSH_BADGE,
            tag: self.tag.as_deref().unwrap_or(DEFAULT_PUSH_TAG),
            data: PushPayloadData {
                url: self.url.as_deref().unwrap_or("/"),
            },
        };
        Ok(serde_json::to_vec(&payload)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// 未配置 VAPID，仅记录日志
    Skipped,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// 前端订阅所需的 VAPID 公钥
    fn public_key(&self) -> Option<&str>;

    /// 订阅失效（404/410）时返回 `PushSubscriptionExpired`
    async fn send(
        &self,
        subscription: &PushSubscription,
        message: &PushMessage,
    ) -> Result<PushOutcome>;
}

#[derive(Clone)]
pub struct Notifiers {
    pub email: Arc<dyn EmailSender>,
    pub push: Arc<dyn PushSender>,
}

impl Notifiers {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            email: build_email_sender(&config.smtp),
            push: build_push_sender(&config.push),
        }
    }
}
