//! HTTP clients for the provider APIs.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::providers::{ApiFlavor, Provider, ProviderConfig, ProviderCredentials};
use super::{DraftingError, DraftingService};

/// `max_tokens` sent to providers that require it.
pub const MAX_OUTPUT_TOKENS: u32 = 2500;
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct HttpDraftingClient {
    client: reqwest::Client,
    credentials: ProviderCredentials,
    timeout: Duration,
}

impl HttpDraftingClient {
    pub fn new(client: reqwest::Client, credentials: ProviderCredentials, timeout_secs: u64) -> Self {
        Self {
            client,
            credentials,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn request(&self, provider: Provider, prompt: &str) -> Result<String, DraftingError> {
        let config = provider.config();
        let api_key = self
            .credentials
            .get(provider)
            .ok_or(DraftingError::MissingKey(config.display_name))?;

        log::debug!(
            "sending drafting request to {} (model {})",
            config.display_name,
            config.model_id
        );

        let request = match config.api {
            ApiFlavor::OpenAiCompatible => self
                .client
                .post(format!("{}/chat/completions", config.endpoint))
                .bearer_auth(api_key)
                .json(&openai_body(config, prompt)),
            ApiFlavor::Anthropic => self
                .client
                .post(format!("{}/v1/messages", config.endpoint))
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&anthropic_body(config, prompt)),
            ApiFlavor::Gemini => self
                .client
                .post(format!(
                    "{}/v1beta/models/{}:generateContent",
                    config.endpoint, config.model_id
                ))
                .query(&[("key", api_key)])
                .json(&gemini_body(prompt)),
        };

        let response = request.timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::warn!("{} returned HTTP {}", config.display_name, status);
            return Err(DraftingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        extract_text(config.api, &payload)
    }
}

#[async_trait]
impl DraftingService for HttpDraftingClient {
    async fn draft(&self, provider: Provider, prompt: &str) -> String {
        match self.request(provider, prompt).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("drafting with {} failed: {}", provider, e);
                e.to_draft_text()
            }
        }
    }

    fn is_configured(&self, provider: Provider) -> bool {
        self.credentials.get(provider).is_some()
    }
}

fn openai_body(config: &ProviderConfig, prompt: &str) -> Value {
    json!({
        "model": config.model_id,
        "messages": [{ "role": "user", "content": prompt }]
    })
}

fn anthropic_body(config: &ProviderConfig, prompt: &str) -> Value {
    json!({
        "model": config.model_id,
        "max_tokens": MAX_OUTPUT_TOKENS,
        "messages": [{ "role": "user", "content": prompt }]
    })
}

fn gemini_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }]
    })
}

/// Pull the generated text out of a provider response.
pub fn extract_text(api: ApiFlavor, payload: &Value) -> Result<String, DraftingError> {
    let text = match api {
        ApiFlavor::OpenAiCompatible => payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str),
        ApiFlavor::Anthropic => payload
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str),
        ApiFlavor::Gemini => payload
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(Value::as_str),
    };

    text.map(str::to_string)
        .ok_or_else(|| DraftingError::UnexpectedResponse(payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafting::MISSING_KEY_MESSAGE;

    #[test]
    fn test_extract_openai() {
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": "Dear Sirs"}}]});
        assert_eq!(
            extract_text(ApiFlavor::OpenAiCompatible, &payload).unwrap(),
            "Dear Sirs"
        );
    }

    #[test]
    fn test_extract_anthropic() {
        let payload = json!({"content": [{"type": "text", "text": "Dear Sirs"}]});
        assert_eq!(
            extract_text(ApiFlavor::Anthropic, &payload).unwrap(),
            "Dear Sirs"
        );
    }

    #[test]
    fn test_extract_gemini() {
        let payload = json!({"candidates": [{"content": {"parts": [{"text": "Dear Sirs"}]}}]});
        assert_eq!(extract_text(ApiFlavor::Gemini, &payload).unwrap(), "Dear Sirs");
    }

    #[test]
    fn test_extract_unexpected() {
        let payload = json!({"error": "nope"});
        assert!(matches!(
            extract_text(ApiFlavor::OpenAiCompatible, &payload),
            Err(DraftingError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_request_bodies() {
        let body = anthropic_body(Provider::Claude.config(), "hi");
        assert_eq!(body["max_tokens"], MAX_OUTPUT_TOKENS);
        assert_eq!(body["model"], "claude-3-opus-20240229");
        let body = openai_body(Provider::DeepSeek.config(), "hi");
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn test_missing_key_becomes_draft_text() {
        let client = HttpDraftingClient::new(
            reqwest::Client::new(),
            ProviderCredentials::default(),
            5,
        );
        assert!(!client.is_configured(Provider::OpenAi));
        let text = client.draft(Provider::OpenAi, "prompt").await;
        assert_eq!(text, MISSING_KEY_MESSAGE);
    }
}
