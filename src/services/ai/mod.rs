//! LLM gateway
//!
//! 业务代码只依赖 [`GenerativeModel`]，生产实现为 Gemini REST，测试中替换为 mock。

mod gemini;
pub mod parse;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::errors::Result;

pub use gemini::GeminiModel;
pub use parse::{parse_json_response, strip_code_fences};

/// 随请求发送的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// 一次生成请求：文本 prompt，可选一张图片
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: InlineImage) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
        }
    }
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// 模型名（日志用）
    fn name(&self) -> &str;

    /// 返回模型输出的原始文本
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// 按配置构建模型，未配置 API key 时返回 None
pub fn build_model(config: &AiConfig) -> Option<Arc<dyn GenerativeModel>> {
    match GeminiModel::from_config(config) {
        Some(model) => {
            info!("AI model configured: {}", model.name());
            Some(Arc::new(model))
        }
        None => {
            warn!("AI API key not configured, OCR disabled and risk prediction uses rules only");
            None
        }
    }
}
