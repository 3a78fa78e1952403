//! Gemini `generateContent` REST 客户端
//!
//! ureq 是同步客户端，请求在 spawn_blocking 中执行。

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ureq::Agent;

use super::{GenerationRequest, GenerativeModel};
use crate::config::AiConfig;
use crate::errors::{MediRemindError, Result};

pub struct GeminiModel {
    api_key: String,
    model: String,
    endpoint: String,
    agent: Agent,
}

impl GeminiModel {
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            agent,
        }
    }

    /// 未配置 key 时返回 None
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        Some(Self::new(
            api_key,
            &config.model,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call_sync(
        agent: Agent,
        endpoint: String,
        api_key: String,
        body: GenerateContentBody,
    ) -> Result<GenerateContentResponse> {
        match agent
            .post(&endpoint)
            .header("x-goog-api-key", &api_key)
            .send_json(&body)
        {
            Ok(resp) => resp
                .into_body()
                .read_json::<GenerateContentResponse>()
                .map_err(|e| MediRemindError::ai_service(format!("Invalid AI service response: {}", e))),
            Err(ureq::Error::StatusCode(429)) => {
                warn!("AI service quota exceeded");
                Err(MediRemindError::ai_quota_exceeded("AI service quota exceeded"))
            }
            Err(ureq::Error::StatusCode(code)) => Err(MediRemindError::ai_service(format!(
                "AI service returned HTTP {}",
                code
            ))),
            Err(e) => Err(MediRemindError::ai_service(format!(
                "AI service request failed: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let body = GenerateContentBody::from_request(&request);
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();

        debug!(
            "Calling {} (image: {})",
            self.model,
            request.image.is_some()
        );

        let response =
            tokio::task::spawn_blocking(move || Self::call_sync(agent, endpoint, api_key, body))
                .await
                .map_err(|e| MediRemindError::ai_service(format!("AI request task failed: {}", e)))??;

        response.text()
    }
}

// ============ Wire types ============

#[derive(Debug, Serialize)]
struct GenerateContentBody {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentBody {
    fn from_request(request: &GenerationRequest) -> Self {
        let mut parts = vec![RequestPart::Text {
            text: request.prompt.clone(),
        }];
        if let Some(ref image) = request.image {
            parts.push(RequestPart::Inline {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&image.data),
                },
            });
        }
        Self {
            contents: vec![RequestContent { parts }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// 第一个候选的所有文本片段
    fn text(&self) -> Result<String> {
        let text: String = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
                .unwrap_or("empty response");
            return Err(MediRemindError::ai_service(format!(
                "AI service returned no content ({})",
                reason
            )));
        }
        Ok(text)
    }
}
