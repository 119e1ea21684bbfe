//! Prescription extraction collaborator.
//!
//! Sends a prescription photo (base64) to the AI gateway and turns the
//! model reply into a cleaned list of candidate medicine names. The
//! surrounding flow always falls back to manual entry, so every error
//! here maps to a distinct user-facing message and nothing more.

use regex::Regex;
use serde::{Deserialize, Serialize};

const GATEWAY_ENDPOINT: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
const GATEWAY_MODEL: &str = "google/gemini-2.5-flash";

/// Upper bound on candidates returned to the review screen.
const MAX_CANDIDATES: usize = 15;

const SYSTEM_PROMPT: &str = "You are a medical prescription analyzer. Extract ONLY medicine names from prescription images.

Rules:
- Return ONLY a JSON array of medicine name strings
- Extract medicine/drug names only (not dosages, frequencies, or instructions)
- Include both brand names and generic names if visible
- Clean up any OCR-like errors in medicine names
- If no medicines are found, return an empty array []
- Do NOT include dosage amounts (mg, ml, etc.) in the names
- Do NOT include instructions like \"twice daily\" or \"after food\"

Example output: [\"Paracetamol\", \"Amoxicillin\", \"Omeprazole\"]";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("No gateway API key configured")]
    MissingApiKey,
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("Payment required. Please add credits to continue.")]
    PaymentRequired,
    #[error("AI gateway error: {0}")]
    Gateway(String),
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Client for the prescription-analysis gateway.
pub struct PrescriptionAnalyzer {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl PrescriptionAnalyzer {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: GATEWAY_ENDPOINT.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Analyze a prescription image, returning candidate medicine
    /// names (possibly empty).
    pub async fn analyze(&self, image_base64: &str) -> Result<Vec<String>, ExtractionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ExtractionError::MissingApiKey)?;

        let image_url = if image_base64.starts_with("data:") {
            image_base64.to_string()
        } else {
            format!("data:image/jpeg;base64,{image_base64}")
        };

        let request = ChatRequest {
            model: GATEWAY_MODEL,
            messages: vec![
                serde_json::json!({"role": "system", "content": SYSTEM_PROMPT}),
                serde_json::json!({
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": "Extract all medicine names from this prescription image. Return only a JSON array of medicine name strings."
                        },
                        {"type": "image_url", "image_url": {"url": image_url}}
                    ]
                }),
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        match response.status().as_u16() {
            429 => return Err(ExtractionError::RateLimited),
            402 => return Err(ExtractionError::PaymentRequired),
            s if !response.status().is_success() => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = s, %body, "AI gateway error");
                return Err(ExtractionError::Gateway(format!("status {s}")));
            }
            _ => {}
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_else(|| "[]".to_string());

        let candidates = parse_medicine_names(&content);
        tracing::info!(count = candidates.len(), "Extracted medicine candidates");
        Ok(candidates)
    }
}

/// Pull medicine names out of the model reply.
///
/// Prefers the first JSON array embedded in the content; falls back to
/// splitting on commas/newlines when the model ignored the format.
pub fn parse_medicine_names(content: &str) -> Vec<String> {
    let names = extract_json_array(content).unwrap_or_else(|| {
        content
            .split(|c| c == ',' || c == '\n')
            .map(|l| l.trim().trim_matches(|c| c == '"' || c == '[' || c == ']').to_string())
            .filter(|l| l.len() > 2)
            .collect()
    });
    clean_medicine_names(names)
}

fn extract_json_array(content: &str) -> Option<Vec<String>> {
    let re = Regex::new(r"\[[\s\S]*?\]").ok()?;
    let matched = re.find(content)?;
    serde_json::from_str::<Vec<String>>(matched.as_str()).ok()
}

/// Drop non-name tokens the model sometimes leaks through: bare
/// numbers, units, form/frequency words. Caps the list.
fn clean_medicine_names(names: Vec<String>) -> Vec<String> {
    let noise = Regex::new(r"(?i)^\d+$|^mg$|^ml$|^tablet|^capsule|^daily|^twice|^once")
        .expect("static regex");
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| n.len() >= 2)
        .filter(|n| !noise.is_match(n))
        .take(MAX_CANDIDATES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_array() {
        let names = parse_medicine_names(r#"["Paracetamol", "Amoxicillin"]"#);
        assert_eq!(names, vec!["Paracetamol", "Amoxicillin"]);
    }

    #[test]
    fn parses_array_embedded_in_prose() {
        let content = "Here are the medicines I found:\n[\"Metformin\", \"Lisinopril\"]\nLet me know!";
        let names = parse_medicine_names(content);
        assert_eq!(names, vec!["Metformin", "Lisinopril"]);
    }

    #[test]
    fn empty_array_yields_no_candidates() {
        assert!(parse_medicine_names("[]").is_empty());
    }

    #[test]
    fn falls_back_to_line_splitting() {
        let content = "Paracetamol, Amoxicillin\nOmeprazole";
        let names = parse_medicine_names(content);
        assert_eq!(names, vec!["Paracetamol", "Amoxicillin", "Omeprazole"]);
    }

    #[test]
    fn cleanup_drops_dosage_and_frequency_tokens() {
        let names = parse_medicine_names(
            r#"["Paracetamol", "500", "mg", "Tablet", "twice daily", "Omeprazole"]"#,
        );
        assert_eq!(names, vec!["Paracetamol", "Omeprazole"]);
    }

    #[test]
    fn cleanup_drops_single_characters() {
        let names = parse_medicine_names(r#"["X", "Omeprazole"]"#);
        assert_eq!(names, vec!["Omeprazole"]);
    }

    #[test]
    fn candidate_list_is_capped() {
        let many: Vec<String> = (0..30).map(|i| format!("Medicine{i}")).collect();
        let json = serde_json::to_string(&many).unwrap();
        assert_eq!(parse_medicine_names(&json).len(), 15);
    }

    #[tokio::test]
    async fn missing_api_key_is_distinct_error() {
        let analyzer = PrescriptionAnalyzer::new(None);
        let err = analyzer.analyze("abc").await.unwrap_err();
        assert!(matches!(err, ExtractionError::MissingApiKey));
    }
}
