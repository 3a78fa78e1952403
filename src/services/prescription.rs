//! Prescription label OCR through the LLM gateway

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::{MediRemindError, Result};
use crate::services::ai::{GenerationRequest, GenerativeModel, parse_json_response, prompts};
use crate::services::image::decode_image_payload;

/// 从处方图片提取的药品信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: String,
}

impl ExtractedMedication {
    /// 缺失或非字符串的字段使用默认值
    fn from_value(value: &Value) -> Self {
        let field = |key: &str, default: &str| {
            value
                .get(key)
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            name: field("name", "Unknown"),
            dosage: field("dosage", "Unknown"),
            frequency: field("frequency", "As directed"),
            instructions: field("instructions", "Take as directed"),
        }
    }
}

pub struct PrescriptionService {
    model: Option<Arc<dyn GenerativeModel>>,
}

impl PrescriptionService {
    pub fn new(model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self { model }
    }

    pub async fn extract(&self, image_payload: &str, requested_by: &str) -> Result<ExtractedMedication> {
        let image = decode_image_payload(image_payload)?;

        let model = self
            .model
            .as_ref()
            .ok_or_else(|| MediRemindError::not_configured("AI service not configured"))?;

        let text = model
            .generate(GenerationRequest::with_image(
                prompts::PRESCRIPTION_OCR_PROMPT,
                image,
            ))
            .await?;

        let value: Value = parse_json_response(&text)?;
        if !value.is_object() {
            return Err(MediRemindError::ai_response_parse(
                crate::services::ai::parse::PARSE_FAILURE_MESSAGE,
            ));
        }

        let extracted = ExtractedMedication::from_value(&value);
        info!("OCR successful for {}: {}", requested_by, extracted.name);
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_missing_fields() {
        let extracted = ExtractedMedication::from_value(&json!({"name": "Amoxicillin"}));
        assert_eq!(extracted.name, "Amoxicillin");
        assert_eq!(extracted.dosage, "Unknown");
        assert_eq!(extracted.frequency, "As directed");
        assert_eq!(extracted.instructions, "Take as directed");
    }

    #[test]
    fn test_numeric_fields_are_stringified() {
        let extracted = ExtractedMedication::from_value(&json!({"dosage": 500}));
        assert_eq!(extracted.dosage, "500");
    }

    #[tokio::test]
    async fn test_unconfigured_model_is_service_unavailable() {
        use base64::Engine;
        let jpeg = base64::engine::general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0]);
        let service = PrescriptionService::new(None);
        let err = service.extract(&jpeg, "a@b.com").await.unwrap_err();
        assert!(matches!(err, MediRemindError::NotConfigured(_)));
    }
}
