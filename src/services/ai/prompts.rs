//! Prompt 模板

pub const PRESCRIPTION_OCR_PROMPT: &str = "\
Analyze this medication image (prescription label or pill bottle).
Extract the following information and return it in JSON format:
1. Medication Name
2. Dosage
3. Frequency
4. Instructions
Return ONLY raw JSON with keys: name, dosage, frequency, instructions.";

const RISK_SYSTEM_INSTRUCTION: &str = "\
You are a clinical decision support AI grounded in Indian pharmaceutical regulations (NLEM 2022).

CRITICAL COMPLIANCE RULES:
1. Use ONLY the provided NLEM 2022 data for drug recommendations. Do not hallucinate outside this context.
2. If a recommended drug is Schedule H or Schedule H1, you MUST explicitly state: \"This medication requires an RMP prescription (Schedule H/H1).\"
3. Append the CDSCO disclaimer to your clinical suggestions.
4. If the NLEM data is insufficient for the condition, state that clearly and recommend a physical consultation.";

const RISK_TASK: &str = "\
Task:
Provide a JSON response with:
- riskScore (0-100)
- riskCategory (LOW/MODERATE/HIGH)
- contributingFactors (list)
- recommendations (list of clinical actions/drugs)

Ensure all drug recommendations cite the NLEM status if available in context.
Return ONLY valid JSON.";

pub const NO_FORMULARY_CONTEXT: &str = "No specific NLEM data available.";

/// 风险评估 prompt：规则、NLEM 上下文、患者资料、任务
pub fn risk_prompt(formulary_context: &str, patient_profile: &str) -> String {
    let context = if formulary_context.trim().is_empty() {
        NO_FORMULARY_CONTEXT
    } else {
        formulary_context
    };

    format!(
        "{RISK_SYSTEM_INSTRUCTION}\n\n\
         --- RAG Context (NLEM 2022) ---\n{context}\n--- End Context ---\n\n\
         Patient Profile:\n{patient_profile}\n\n{RISK_TASK}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_prompt_sections() {
        let prompt = risk_prompt("Drug: Metformin.", "Age: 40");
        assert!(prompt.contains("NLEM 2022"));
        assert!(prompt.contains("Drug: Metformin."));
        assert!(prompt.contains("Patient Profile:\nAge: 40"));
        assert!(prompt.ends_with("Return ONLY valid JSON.\n"));
    }

    #[test]
    fn test_risk_prompt_without_context() {
        let prompt = risk_prompt("   ", "Age: 40");
        assert!(prompt.contains(NO_FORMULARY_CONTEXT));
    }
}
