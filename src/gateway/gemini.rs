use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::Config;
use crate::exam::model::{ExamPaper, ExamResult};
use crate::gateway::paper::{GroundingChunk, collect_sources, parse_paper};
use crate::gateway::{ExamAi, GatewayError, PaperRequest, prompt};

const ERROR_BODY_CHARS: usize = 300;

/// Client for the `generateContent` REST endpoint.
pub struct GeminiGateway {
    client: Client,
    api_key: String,
    base_url: String,
    paper_model: String,
    commentary_model: String,
    use_search: bool,
    thinking_budget: u32,
    region: String,
    grade: String,
    default_minutes: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

impl GenerateResponse {
    /// Answer text of the first candidate, thought parts excluded.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn grounding_chunks(&self) -> &[GroundingChunk] {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or(&[])
    }
}

fn paper_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": "Title of the exam paper" },
            "subject": { "type": "STRING" },
            "duration": { "type": "NUMBER" },
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "type": { "type": "STRING", "description": "Must be one of: 单选题, 多选题, 填空题, 简答题" },
                        "content": { "type": "STRING" },
                        "options": { "type": "ARRAY", "items": { "type": "STRING" }, "description": "Required for 单选题 and 多选题" },
                        "answer": { "type": "STRING", "description": "Correct answer(s). For 多选题, use comma separated values like A,C" },
                        "explanation": { "type": "STRING" },
                        "points": { "type": "NUMBER" },
                        "difficulty": { "type": "STRING" },
                        "chapter": { "type": "STRING" }
                    },
                    "required": ["id", "type", "content", "answer", "explanation", "points", "difficulty", "chapter"]
                }
            }
        },
        "required": ["title", "subject", "duration", "questions"]
    })
}

fn text_body(prompt: &str) -> Value {
    json!({ "contents": [{ "role": "user", "parts": [{ "text": prompt }] }] })
}

impl GeminiGateway {
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let api_key = config.resolve_api_key().ok_or(GatewayError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            paper_model: config.paper_model.clone(),
            commentary_model: config.commentary_model.clone(),
            use_search: config.use_search,
            thinking_budget: config.thinking_budget,
            region: config.region.clone(),
            grade: config.grade.clone(),
            default_minutes: config.default_duration_minutes,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    fn paper_body(&self, request: &PaperRequest) -> Value {
        let prompt = prompt::paper_prompt(request, &self.region, &self.grade, self.use_search);
        let mut body = text_body(&prompt);
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": paper_schema(),
            "thinkingConfig": { "thinkingBudget": self.thinking_budget },
        });
        if self.use_search {
            body["tools"] = json!([{ "googleSearch": {} }]);
        }
        body
    }

    fn call(&self, model: &str, body: &Value) -> Result<GenerateResponse, GatewayError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Unavailable("request timed out".to_string())
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let body = prompt::excerpt(&body, ERROR_BODY_CHARS).to_string();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<GenerateResponse>()
            .map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

impl ExamAi for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_paper(&self, request: &PaperRequest) -> Result<ExamPaper, GatewayError> {
        request.validate()?;
        let response = self.call(&self.paper_model, &self.paper_body(request))?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GatewayError::Malformed("empty paper response".to_string()));
        }
        let sources = collect_sources(response.grounding_chunks());
        let paper = parse_paper(&text, request, self.default_minutes, sources, Utc::now())?;
        tracing::info!(
            paper_id = %paper.id,
            questions = paper.questions.len(),
            sources = paper.sources.len(),
            "paper generated"
        );
        Ok(paper)
    }

    fn generate_commentary(
        &self,
        result: &ExamResult,
        paper: &ExamPaper,
    ) -> Result<String, GatewayError> {
        let prompt = prompt::commentary_prompt(result, paper, &self.region);
        let response = self.call(&self.commentary_model, &text_body(&prompt))?;
        Ok(response.text())
    }

    fn analyze_mistakes(&self, summary: &str) -> Result<String, GatewayError> {
        let prompt = prompt::analysis_prompt(summary);
        let response = self.call(&self.commentary_model, &text_body(&prompt))?;
        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::{Difficulty, Subject};

    #[test]
    fn test_missing_key_is_reported() {
        if std::env::var("GEMINI_API_KEY").is_ok() || std::env::var("API_KEY").is_ok() {
            return;
        }
        let outcome = GeminiGateway::from_config(&Config::default());
        assert!(matches!(outcome, Err(GatewayError::MissingApiKey)));
    }

    #[test]
    fn test_response_text_skips_thoughts() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"title\":"},
                    {"text": "\"x\"}"}
                ]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://edu.example", "title": "课标"}}
                ]}
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), r#"{"title":"x"}"#);
        assert_eq!(collect_sources(response.grounding_chunks())[0].title, "课标");

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
        assert!(empty.grounding_chunks().is_empty());
    }

    #[test]
    fn test_paper_body_shape() {
        let config = Config {
            api_key: Some("k".to_string()),
            ..Config::default()
        };
        let gateway = GeminiGateway::from_config(&config).unwrap();
        let request = PaperRequest::new(
            Subject::Math,
            vec!["第一章".to_string()],
            Difficulty::Medium,
            10,
        );
        let body = gateway.paper_body(&request);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 24000);
        assert!(body["tools"][0].get("googleSearch").is_some());
        assert!(
            gateway
                .endpoint("gemini-3-pro-preview")
                .ends_with("/v1beta/models/gemini-3-pro-preview:generateContent")
        );
    }
}
