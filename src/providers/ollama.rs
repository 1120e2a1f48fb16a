//! Secondary provider: locally reachable Ollama-compatible chat server

use crate::providers::{ProviderError, ProviderKind, ResponseProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Secondary provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: Url,
    pub model: String,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
}

impl OllamaConfig {
    pub fn new(endpoint: Url, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
            system_prompt: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Ollama chat provider
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, input: &str) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.config.system_prompt {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: input.to_string(),
        });

        OllamaChatRequest {
            model: self.config.model.clone(),
            messages,
            stream: false,
        }
    }

    fn parse_reply(response: OllamaChatResponse) -> Result<String, ProviderError> {
        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "message carried no text content".to_string(),
            ));
        }
        Ok(content.trim().to_string())
    }

    fn chat_url(&self) -> Result<Url, ProviderError> {
        self.config
            .endpoint
            .join("/api/chat")
            .map_err(|e| ProviderError::NotConfigured(format!("bad secondary endpoint: {e}")))
    }
}

#[async_trait]
impl ResponseProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Secondary
    }

    fn label(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, input: &str) -> Result<String, ProviderError> {
        let request = self.build_request(input);
        debug!(model = %request.model, endpoint = %self.config.endpoint, "secondary completion request");

        let response = self
            .client
            .post(self.chat_url()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "secondary API error: {status} - {body}"
            )));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Self::parse_reply(parsed)
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}
