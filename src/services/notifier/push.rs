//! Web Push 发送
//!
//! 载荷按 RFC 8291（aes128gcm）加密，请求用 RFC 8292 VAPID（ES256 JWT）签名。

use std::sync::Arc;
use std::time::Duration;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::Utc;
use hkdf::Hkdf;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use p256::{PublicKey, SecretKey};
use rand::RngExt;
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, info, warn};
use ureq::Agent;

use super::{PushMessage, PushOutcome, PushSender};
use crate::config::PushConfig;
use crate::errors::{MediRemindError, Result};
use crate::storage::PushSubscription;

/// 单条记录大小（RFC 8188 rs）
const RECORD_SIZE: u32 = 4096;
/// 16 字节 tag + 1 字节分隔符
const RECORD_OVERHEAD: usize = 17;
const VAPID_TOKEN_HOURS: i64 = 12;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 同时接受 base64url 与标准 base64
fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>> {
    let normalized: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_LENIENT
        .decode(normalized.as_bytes())
        .map_err(|e| MediRemindError::push_notification(format!("Invalid {}: {}", field, e)))
}

fn random_secret_key() -> SecretKey {
    loop {
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        // 全零或不小于曲线阶时重试
        if let Ok(key) = SecretKey::from_slice(&bytes) {
            return key;
        }
    }
}

fn uncompressed_point(key: &PublicKey) -> Vec<u8> {
    key.to_encoded_point(false).as_bytes().to_vec()
}

// ============ VAPID ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVapidKeys {
    pub public_key: String,
    pub private_key: String,
}

/// 生成新的 P-256 VAPID 密钥对（base64url）
pub fn generate_vapid_keys() -> GeneratedVapidKeys {
    let secret = random_secret_key();
    GeneratedVapidKeys {
        public_key: URL_SAFE_NO_PAD.encode(uncompressed_point(&secret.public_key())),
        private_key: URL_SAFE_NO_PAD.encode(secret.to_bytes()),
    }
}

#[derive(Debug, Serialize)]
struct VapidClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

pub struct VapidKeys {
    secret: SecretKey,
    public_key: String,
}

impl VapidKeys {
    fn from_secret(secret: SecretKey) -> Self {
        let public_key = URL_SAFE_NO_PAD.encode(uncompressed_point(&secret.public_key()));
        Self { secret, public_key }
    }

    /// 原始 32 字节标量，或 PKCS#8 / SEC1 DER，均为 base64
    pub fn from_base64(value: &str) -> Result<Self> {
        let bytes = decode_b64("VAPID private key", value)?;
        let secret = if bytes.len() == 32 {
            SecretKey::from_slice(&bytes).ok()
        } else {
            SecretKey::from_pkcs8_der(&bytes)
                .ok()
                .or_else(|| SecretKey::from_sec1_der(&bytes).ok())
        }
        .ok_or_else(|| MediRemindError::config("Invalid VAPID private key"))?;

        Ok(Self::from_secret(secret))
    }

    /// PKCS#8 或 SEC1 PEM
    pub fn from_pem(pem: &str) -> Result<Self> {
        let secret = SecretKey::from_pkcs8_pem(pem)
            .ok()
            .or_else(|| SecretKey::from_sec1_pem(pem).ok())
            .ok_or_else(|| MediRemindError::config("Invalid VAPID private key PEM"))?;
        Ok(Self::from_secret(secret))
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// `aud` 为推送服务的 origin
    pub fn authorization(&self, endpoint: &str, subject: &str) -> Result<String> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| MediRemindError::push_notification(format!("Invalid endpoint: {}", e)))?;
        let audience = url.origin().ascii_serialization();

        let claims = VapidClaims {
            aud: &audience,
            exp: (Utc::now() + chrono::Duration::hours(VAPID_TOKEN_HOURS)).timestamp(),
            sub: subject,
        };

        let der = self
            .secret
            .to_pkcs8_der()
            .map_err(|e| MediRemindError::config(format!("Cannot encode VAPID key: {}", e)))?;
        let token = encode(
            &Header::new(Algorithm::ES256),
            &claims,
            &EncodingKey::from_ec_der(der.as_bytes()),
        )
        .map_err(|e| MediRemindError::push_notification(format!("VAPID signing failed: {}", e)))?;

        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }
}

// ============ RFC 8291 ============

/// 按订阅的 p256dh / auth 加密载荷，返回 aes128gcm 请求体
pub fn encrypt_payload(p256dh: &str, auth: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let ua_public = PublicKey::from_sec1_bytes(&decode_b64("p256dh key", p256dh)?)
        .map_err(|_| MediRemindError::push_notification("Invalid p256dh key"))?;
    let auth_secret = decode_b64("auth key", auth)?;

    let mut salt = [0u8; 16];
    rand::rng().fill(&mut salt);

    encrypt_with(&ua_public, &auth_secret, plaintext, &random_secret_key(), salt)
}

fn encrypt_with(
    ua_public: &PublicKey,
    auth_secret: &[u8],
    plaintext: &[u8],
    as_secret: &SecretKey,
    salt: [u8; 16],
) -> Result<Vec<u8>> {
    if plaintext.len() + RECORD_OVERHEAD > RECORD_SIZE as usize {
        return Err(MediRemindError::push_notification("Push payload too large"));
    }

    let ua_bytes = uncompressed_point(ua_public);
    let as_bytes = uncompressed_point(&as_secret.public_key());
    let shared = p256::ecdh::diffie_hellman(as_secret.to_nonzero_scalar(), ua_public.as_affine());

    let mut key_info = Vec::with_capacity(14 + 65 + 65);
    key_info.extend_from_slice(b"WebPush: info\0");
    key_info.extend_from_slice(&ua_bytes);
    key_info.extend_from_slice(&as_bytes);

    let mut ikm = [0u8; 32];
    Hkdf::<Sha256>::new(Some(auth_secret), shared.raw_secret_bytes())
        .expand(&key_info, &mut ikm)
        .map_err(|_| MediRemindError::push_notification("HKDF expand failed"))?;

    let hk = Hkdf::<Sha256>::new(Some(&salt), &ikm);
    let mut cek = [0u8; 16];
    let mut nonce = [0u8; 12];
    hk.expand(b"Content-Encoding: aes128gcm\0", &mut cek)
        .and_then(|_| hk.expand(b"Content-Encoding: nonce\0", &mut nonce))
        .map_err(|_| MediRemindError::push_notification("HKDF expand failed"))?;

    let mut record = Vec::with_capacity(plaintext.len() + 1);
    record.extend_from_slice(plaintext);
    // 最后一条记录的分隔符
    record.push(0x02);

    let cipher = Aes128Gcm::new_from_slice(&cek)
        .map_err(|_| MediRemindError::push_notification("Invalid content encryption key"))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), record.as_slice())
        .map_err(|_| MediRemindError::push_notification("Payload encryption failed"))?;

    let mut body = Vec::with_capacity(16 + 4 + 1 + as_bytes.len() + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(as_bytes.len() as u8);
    body.extend_from_slice(&as_bytes);
    body.extend_from_slice(&ciphertext);
    Ok(body)
}

// ============ Senders ============

pub struct WebPushSender {
    keys: VapidKeys,
    subject: String,
    ttl_secs: u32,
    agent: Agent,
}

impl WebPushSender {
    pub fn new(keys: VapidKeys, subject: &str, ttl_secs: u32, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            keys,
            subject: subject.to_string(),
            ttl_secs,
            agent,
        }
    }

    fn post_sync(
        agent: Agent,
        endpoint: String,
        authorization: String,
        ttl_secs: u32,
        body: Vec<u8>,
    ) -> Result<()> {
        let short = endpoint_preview(&endpoint);
        match agent
            .post(&endpoint)
            .header("Content-Encoding", "aes128gcm")
            .header("Content-Type", "application/octet-stream")
            .header("TTL", ttl_secs.to_string())
            .header("Authorization", authorization)
            .send(&body[..])
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(code @ (404 | 410))) => {
                warn!("Push subscription gone ({}): {}", code, short);
                Err(MediRemindError::push_subscription_expired(format!(
                    "Subscription expired ({}): {}",
                    code, short
                )))
            }
            Err(ureq::Error::StatusCode(code)) => Err(MediRemindError::push_notification(
                format!("Push service returned HTTP {} for {}", code, short),
            )),
            Err(e) => Err(MediRemindError::push_notification(format!(
                "Push request to {} failed: {}",
                short, e
            ))),
        }
    }
}

fn endpoint_preview(endpoint: &str) -> String {
    let preview: String = endpoint.chars().take(50).collect();
    if preview.len() < endpoint.len() {
        format!("{}...", preview)
    } else {
        preview
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    fn public_key(&self) -> Option<&str> {
        Some(self.keys.public_key())
    }

    async fn send(
        &self,
        subscription: &PushSubscription,
        message: &PushMessage,
    ) -> Result<PushOutcome> {
        let payload = message.to_payload()?;
        let body = encrypt_payload(&subscription.p256dh_key, &subscription.auth_key, &payload)?;
        let authorization = self.keys.authorization(&subscription.endpoint, &self.subject)?;

        let agent = self.agent.clone();
        let endpoint = subscription.endpoint.clone();
        let ttl = self.ttl_secs;
        tokio::task::spawn_blocking(move || {
            Self::post_sync(agent, endpoint, authorization, ttl, body)
        })
        .await
        .map_err(|e| MediRemindError::push_notification(format!("Push task failed: {}", e)))??;

        info!("Push notification sent: {}", message.title);
        Ok(PushOutcome::Delivered)
    }
}

/// 未配置 VAPID 私钥时只记录日志
#[derive(Debug, Default, Clone)]
pub struct LogPushSender {
    public_key: Option<String>,
}

impl LogPushSender {
    pub fn new(public_key: Option<String>) -> Self {
        Self { public_key }
    }
}

#[async_trait]
impl PushSender for LogPushSender {
    fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    async fn send(
        &self,
        subscription: &PushSubscription,
        message: &PushMessage,
    ) -> Result<PushOutcome> {
        info!(
            "[MOCK PUSH] {} | Title: {}, Body: {}",
            endpoint_preview(&subscription.endpoint),
            message.title,
            message.body
        );
        Ok(PushOutcome::Skipped)
    }
}

fn load_vapid_keys(config: &PushConfig) -> Result<Option<VapidKeys>> {
    if let Some(path) = config
        .vapid_private_key_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            MediRemindError::file_operation(format!("Cannot read VAPID key {}: {}", path, e))
        })?;
        return VapidKeys::from_pem(&pem).map(Some);
    }

    if let Some(key) = config
        .vapid_private_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
    {
        return VapidKeys::from_base64(key).map(Some);
    }

    Ok(None)
}

pub fn build_push_sender(config: &PushConfig) -> Arc<dyn PushSender> {
    let configured_public = config
        .vapid_public_key
        .clone()
        .filter(|k| !k.trim().is_empty());

    match load_vapid_keys(config) {
        Ok(Some(keys)) => {
            if let Some(ref public) = configured_public
                && public.trim_end_matches('=') != keys.public_key()
            {
                warn!("Configured VAPID public key does not match the private key, using derived key");
            }
            info!("Web Push enabled");
            Arc::new(WebPushSender::new(
                keys,
                &config.vapid_mailto,
                config.ttl_secs,
                Duration::from_secs(config.timeout_secs),
            ))
        }
        Ok(None) => {
            warn!("VAPID keys not configured, push notifications will be logged only");
            Arc::new(LogPushSender {
                public_key: configured_public,
            })
        }
        Err(e) => {
            warn!("VAPID key setup failed ({}), push notifications will be logged only", e);
            debug!("Push config: mailto={}", config.vapid_mailto);
            Arc::new(LogPushSender {
                public_key: configured_public,
            })
        }
    }
}
