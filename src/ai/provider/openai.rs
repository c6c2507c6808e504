//! OpenAI-compatible Chat Completions provider
//!
//! Talks to OpenAI or any compatible endpoint (Ollama exposes one under
//! `/v1`). Local endpoints run without an API key.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{ErrorClassifier, LlmProvider, LlmResponse, ProviderConfig, TokenUsage};
use crate::ai::json::extract_json_from_response;
use crate::ai::timeout::TimeoutConfig;
use crate::types::{DocweaveError, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const OLLAMA_API_BASE: &str = "http://localhost:11434/v1";

pub struct OpenAiProvider {
    name: &'static str,
    /// Never exposed in logs or debug output
    api_key: Option<SecretString>,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    /// Hosted OpenAI; requires `OPENAI_API_KEY` or an explicit key
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                DocweaveError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var".to_string(),
                )
            })?;
        Self::build("openai", config, Some(key), OPENAI_API_BASE)
    }

    /// Local Ollama through its OpenAI-compatible endpoint
    pub fn ollama(config: ProviderConfig) -> Result<Self> {
        let key = config.api_key.clone();
        Self::build("ollama", config, key, OLLAMA_API_BASE)
    }

    fn build(
        name: &'static str,
        config: ProviderConfig,
        api_key: Option<String>,
        default_base: &str,
    ) -> Result<Self> {
        let timeouts = TimeoutConfig::with_generation_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeouts.generation)
            .connect_timeout(timeouts.connection)
            .build()
            .map_err(|e| DocweaveError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name,
            api_key: api_key.map(SecretString::from),
            api_base: config
                .api_base
                .unwrap_or_else(|| default_base.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> ChatCompletionRequest {
        let system_content = if schema.is_null() {
            "You are a software documentation writer. Always respond with valid JSON.".to_string()
        } else {
            let schema_str =
                serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
            format!(
                "You are a software documentation writer. Respond ONLY with JSON matching this schema:\n\n```json\n{}\n```",
                schema_str
            )
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_content,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key.expose_secret())),
            None => builder,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!(
            "Generating with {} (model: {}, temperature: {})",
            self.name, self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt, schema);
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify(&e.to_string(), self.name))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("{} API error ({}): {}", self.name, status, body),
                self.name,
            )
            .into());
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify(&format!("parse response: {}", e), self.name))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let content_str = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| {
                ErrorClassifier::classify("empty reply: no content in response", self.name)
            })?;

        debug!("Received reply from {}, parsing JSON", self.name);
        let content = extract_json_from_response(content_str)?;

        Ok(LlmResponse {
            content,
            usage,
            latency_ms: start_time.elapsed().as_millis() as u64,
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);
        match self.authorized(self.client.get(&url)).send().await {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!("{} health check failed: {}", self.name, resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("{} health check failed: {}", self.name, e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
