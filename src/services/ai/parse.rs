use serde::de::DeserializeOwned;
use tracing::warn;

use crate::errors::{MediRemindError, Result};

pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse AI response";

/// 去掉 Markdown 代码块标记
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        warn!("AI response is not valid JSON: {}", e);
        MediRemindError::ai_response_parse(PARSE_FAILURE_MESSAGE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_code_fences() {
        let raw = "```json\n{\"name\": \"Aspirin\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"name\": \"Aspirin\"}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_parse_json_response() {
        let value: Value = parse_json_response("```\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value["a"], 1);

        let err = parse_json_response::<Value>("I cannot read this label").unwrap_err();
        assert!(matches!(err, MediRemindError::AiResponseParse(_)));
        assert_eq!(err.message(), PARSE_FAILURE_MESSAGE);
    }
}
