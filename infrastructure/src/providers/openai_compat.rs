//! OpenAI-compatible chat completions client
//!
//! OpenAI, Anthropic, Gemini, Mistral and Ollama all expose a
//! `/chat/completions` endpoint with the same request shape, so one client
//! covers every built-in provider.

use crate::config::ResolvedEndpoint;
use async_trait::async_trait;
use docfiller_application::{ProviderClient, ProviderError, ProviderInitError};
use docfiller_domain::{FieldType, Prompt, ProviderId, RawAnswer};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub struct OpenAiCompatClient {
    provider: ProviderId,
    endpoint: ResolvedEndpoint,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        provider: ProviderId,
        endpoint: ResolvedEndpoint,
        api_key: Option<String>,
    ) -> Result<Self, ProviderInitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_seconds))
            .build()
            .map_err(|e| ProviderInitError::Construction {
                provider: provider.clone(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            provider,
            endpoint,
            api_key,
            client,
        })
    }

    fn url(&self) -> String {
        completions_url(&self.endpoint.base_url)
    }
}

pub(crate) fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Chat request with the profile's system prompt as the system message
pub(crate) fn request_body(model: &str, prompt: &Prompt) -> Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &prompt.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": prompt.body}));

    json!({
        "model": model,
        "messages": messages,
    })
}

/// Pull the first choice's text out of a completions response
pub(crate) fn parse_completion(response: &Value) -> Result<RawAnswer, ProviderError> {
    let content = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .ok_or_else(|| ProviderError::InvalidResponse("no choices[0].message.content".to_string()))?;

    let text = content.as_str().unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(RawAnswer::from_model_text(text))
}

#[async_trait]
impl ProviderClient for OpenAiCompatClient {
    fn provider(&self) -> &ProviderId {
        &self.provider
    }

    async fn invoke(
        &self,
        prompt: &Prompt,
        field_type: FieldType,
    ) -> Result<RawAnswer, ProviderError> {
        debug!(
            "{} <- {} prompt ({} bytes)",
            self.provider,
            field_type,
            prompt.body.len()
        );

        let mut request = self
            .client
            .post(self.url())
            .json(&request_body(&self.endpoint.model, prompt));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!(
                "HTTP {}: {}",
                status,
                docfiller_domain::util::truncate_str(&body, 200)
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_completion(&body)
    }
}
