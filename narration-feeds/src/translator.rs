use crate::traits::Translator;
use crate::types::{AggregatorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

/// Returns the input unchanged. Used when no translation service is set up.
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    fn name(&self) -> String {
        "passthrough".to_string()
    }

    async fn translate(&self, text: &str, _target_lang: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// Client for a LibreTranslate compatible `/translate` endpoint.
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTranslator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Reads `TRANSLATE_API_URL` and `TRANSLATE_API_KEY`; `None` when no
    /// endpoint is configured.
    pub fn from_env(timeout: Duration) -> Result<Option<Self>> {
        let endpoint = match env::var("TRANSLATE_API_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => return Ok(None),
        };
        let api_key = env::var("TRANSLATE_API_KEY").ok().filter(|k| !k.is_empty());
        Self::new(endpoint, api_key, timeout).map(Some)
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    fn name(&self) -> String {
        format!("http({})", self.endpoint)
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        debug!("Translating {} chars to {}", text.chars().count(), target_lang);

        let request = TranslateRequest {
            q: text,
            source: "auto",
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AggregatorError::Translation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::Translation(format!("HTTP {}", status)));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| AggregatorError::Translation(e.to_string()))?;
        Ok(body.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_returns_input() {
        let out = PassthroughTranslator.translate("Xin chào", "en").await.unwrap();
        assert_eq!(out, "Xin chào");
    }

    #[test]
    fn request_body_matches_libretranslate() {
        let request = TranslateRequest {
            q: "Once upon a time",
            source: "auto",
            target: "vi",
            format: "text",
            api_key: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["target"], "vi");
        assert!(json.get("api_key").is_none());

        let parsed: TranslateResponse = serde_json::from_str(r#"{"translatedText":"Ngày xửa ngày xưa"}"#).unwrap();
        assert_eq!(parsed.translated_text, "Ngày xửa ngày xưa");
    }
}
