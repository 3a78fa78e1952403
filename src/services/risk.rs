//! Health risk prediction
//!
//! 优先使用 LLM（附带 NLEM 上下文），任何失败都退回到规则评分。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{MediRemindError, Result};
use crate::services::ai::{GenerationRequest, GenerativeModel, parse_json_response, prompts};
use crate::services::formulary::Formulary;
use crate::utils::validation::{check_length, check_range};

pub const CDSCO_DISCLAIMER: &str = "\n\n---\n⚖️ **CDSCO Disclaimer**: This is an AI-generated suggestion for clinical review only. Final authority rests with a Registered Medical Practitioner (RMP).";

const DEFAULT_SYMPTOM_QUERY: &str = "general checkup";
const NLEM_CONTEXT_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub age: i32,
    pub gender: String,
    #[serde(rename = "systolicBP")]
    pub systolic_bp: i32,
    #[serde(rename = "diastolicBP")]
    pub diastolic_bp: i32,
    pub heart_rate: i32,
    /// kg
    pub weight: f64,
    /// cm
    pub height: f64,
    pub smoking_status: String,
    pub diabetes_status: String,
    #[serde(default)]
    pub family_history: Vec<String>,
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub recent_symptoms: Vec<String>,
}

impl HealthData {
    pub fn validate(&self) -> Result<()> {
        check_range("age", self.age, 1, 120)?;
        check_length("gender", &self.gender, 1, 20)?;
        check_range("systolicBP", self.systolic_bp, 60, 250)?;
        check_range("diastolicBP", self.diastolic_bp, 40, 150)?;
        check_range("heartRate", self.heart_rate, 30, 220)?;
        check_range("weight", self.weight, 10.0, 500.0)?;
        check_range("height", self.height, 50.0, 300.0)?;
        check_length("smokingStatus", &self.smoking_status, 0, 50)?;
        check_length("diabetesStatus", &self.diabetes_status, 0, 50)?;
        check_list("familyHistory", &self.family_history, 20)?;
        check_list("currentMedications", &self.current_medications, 50)?;
        check_list("recentSymptoms", &self.recent_symptoms, 30)?;
        Ok(())
    }

    pub fn bmi(&self) -> f64 {
        let height_m = self.height / 100.0;
        self.weight / (height_m * height_m)
    }

    fn symptom_query(&self) -> String {
        if self.recent_symptoms.is_empty() {
            DEFAULT_SYMPTOM_QUERY.to_string()
        } else {
            self.recent_symptoms.join(", ")
        }
    }

    fn profile(&self) -> String {
        format!(
            "Age: {}, Gender: {}, BP: {}/{}, HR: {}, BMI: {:.1}, Smoking: {}, \
             Diabetes: {}, History: {:?}, Meds: {:?}, Symptoms: {:?}",
            self.age,
            self.gender,
            self.systolic_bp,
            self.diastolic_bp,
            self.heart_rate,
            self.bmi(),
            self.smoking_status,
            self.diabetes_status,
            self.family_history,
            self.current_medications,
            self.recent_symptoms
        )
    }
}

fn check_list(field: &str, items: &[String], max_items: usize) -> Result<()> {
    if items.len() > max_items {
        return Err(MediRemindError::validation(format!(
            "{} must contain at most {} items",
            field, max_items
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPrediction {
    pub risk_score: f64,
    pub risk_category: String,
    pub contributing_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub nlem_context: String,
    pub disclaimer: String,
}

/// 规则评分，AI 不可用时使用
pub fn rule_based_assessment(data: &HealthData) -> (f64, String, Vec<String>, Vec<String>) {
    let mut base_score = 30;
    let mut factors = Vec::new();

    if data.bmi() > 25.0 {
        base_score += 20;
        factors.push("High BMI".to_string());
    }
    if data.systolic_bp > 130 {
        base_score += 20;
        factors.push("Elevated Blood Pressure".to_string());
    }
    if matches!(data.smoking_status.as_str(), "Current" | "Former") {
        base_score += 15;
        factors.push("Smoking History".to_string());
    }

    let category = if base_score > 70 {
        "HIGH"
    } else if base_score > 40 {
        "MODERATE"
    } else {
        "LOW"
    };

    (
        f64::from(base_score.min(95)),
        category.to_string(),
        factors,
        vec![
            "Consult a general physician (AI Unavailable)".to_string(),
            "Maintain healthy diet".to_string(),
        ],
    )
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn score_value(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(50.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(50.0),
        _ => 50.0,
    }
}

pub struct RiskService {
    model: Option<Arc<dyn GenerativeModel>>,
    formulary: Arc<Formulary>,
    top_k: usize,
}

impl RiskService {
    pub fn new(
        model: Option<Arc<dyn GenerativeModel>>,
        formulary: Arc<Formulary>,
        top_k: usize,
    ) -> Self {
        Self {
            model,
            formulary,
            top_k,
        }
    }

    pub async fn predict(&self, data: &HealthData, requested_by: &str) -> Result<RiskPrediction> {
        data.validate()?;

        let nlem_context = self.formulary.context_for(&data.symptom_query(), self.top_k);

        let (risk_score, risk_category, contributing_factors, recommendations) =
            match self.ask_model(data, &nlem_context).await {
                Ok(result) => {
                    let category = result
                        .get("riskCategory")
                        .and_then(Value::as_str)
                        .unwrap_or("MODERATE")
                        .to_string();
                    info!("Risk prediction for {}: {}", requested_by, category);
                    (
                        score_value(result.get("riskScore")),
                        category,
                        string_list(result.get("contributingFactors")),
                        string_list(result.get("recommendations")),
                    )
                }
                Err(e) => {
                    warn!("AI generation failed ({}), using rule-based fallback", e);
                    rule_based_assessment(data)
                }
            };

        Ok(RiskPrediction {
            risk_score,
            risk_category,
            contributing_factors,
            recommendations,
            nlem_context: nlem_context.chars().take(NLEM_CONTEXT_CHARS).collect(),
            disclaimer: CDSCO_DISCLAIMER.to_string(),
        })
    }

    async fn ask_model(&self, data: &HealthData, nlem_context: &str) -> Result<Value> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| MediRemindError::not_configured("AI service not configured"))?;

        let prompt = prompts::risk_prompt(nlem_context, &data.profile());
        let text = model.generate(GenerationRequest::text(prompt)).await?;
        let value: Value = parse_json_response(&text)?;
        if !value.is_object() {
            return Err(MediRemindError::ai_response_parse(
                crate::services::ai::parse::PARSE_FAILURE_MESSAGE,
            ));
        }
        Ok(value)
    }
}
