use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::json;

use super::{BatchFuture, BatchTranslator};
use crate::languages::Language;

const BASE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Batched endpoint speaking the Translate v2 JSON wire format.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    key: String,
    client: reqwest::Client,
}

impl GoogleTranslate {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl BatchTranslator for GoogleTranslate {
    fn translate_batch(&self, texts: Vec<String>, target: Language) -> BatchFuture {
        let client = self.client.clone();
        let key = self.key.clone();
        Box::pin(async move {
            let body = json!({
                "q": texts,
                "target": target.code(),
                "format": "text"
            });

            let response = client
                .post(format!("{}?key={}", BASE_URL, key))
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!("translation API error ({}): {}", status, text));
            }

            extract_translations(&text)
        })
    }
}

fn extract_translations(text: &str) -> Result<Vec<String>> {
    let payload: TranslateResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse translation response JSON: {}", err))?;
    let translations = payload
        .data
        .ok_or_else(|| anyhow!("no data returned from translation API"))?
        .translations;
    Ok(translations
        .into_iter()
        .map(|entry| entry.translated_text)
        .collect())
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: Option<TranslateData>,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<TranslationEntry>,
}

#[derive(Debug, Deserialize)]
struct TranslationEntry {
    #[serde(rename = "translatedText")]
    translated_text: String,
}
