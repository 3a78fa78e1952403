use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::AppServices;
use crate::config::get_config;
use crate::storage::{SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub services: AppServices,
}

/// ureq 与 lettre 共用 rustls，进程内只安装一次 provider
pub fn install_crypto_provider() -> Result<()> {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return Ok(());
    }
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))
}

/// 创建存储（含迁移）
pub async fn prepare_storage() -> Result<Arc<SeaOrmStorage>> {
    install_crypto_provider()?;

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.info().backend);
    Ok(storage)
}

/// 准备服务器启动的上下文：存储、AI、知识库、通知渠道
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = prepare_storage().await?;
    let config = get_config();

    if config.ai.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        warn!("AI API key not configured: OCR is disabled and risk prediction uses the rule-based fallback");
    }
    if !config.smtp.is_configured() {
        warn!("SMTP credentials not configured, reminder emails will be logged only");
    }

    let services = AppServices::from_config(storage.clone(), &config);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext { storage, services })
}
