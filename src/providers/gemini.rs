use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::json;

use super::{EnhancedFuture, EnhancedTranslator};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub(crate) const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Enhanced endpoint backed by a generative-language `generateContent` call.
#[derive(Debug, Clone)]
pub struct GeminiTranslate {
    key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiTranslate {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }
}

impl EnhancedTranslator for GeminiTranslate {
    fn translate_enhanced(&self, _text: String, instruction: String) -> EnhancedFuture {
        let client = self.client.clone();
        let key = self.key.clone();
        let model = self.model.clone();
        Box::pin(async move {
            let url = format!("{}/{}:generateContent", BASE_URL, model);
            let body = json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [{"text": instruction}]
                    }
                ],
                "generationConfig": {
                    "temperature": 0.3,
                    "topP": 0.8,
                    "topK": 40,
                    "maxOutputTokens": 500
                }
            });

            let response = client
                .post(&url)
                .header("x-goog-api-key", key)
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!("enhanced API error ({}): {}", status, text));
            }

            extract_text(&text)
        })
    }
}

fn extract_text(text: &str) -> Result<Option<String>> {
    let payload: GenerateResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse enhanced response JSON: {}", err))?;
    let Some(content) = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
    else {
        return Ok(None);
    };

    let joined = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
