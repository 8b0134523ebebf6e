use std::time::Duration;

use async_trait::async_trait;
use ragdemo_common::{RagError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{LlmClient, LlmRequest, LlmResponse, Role, TokenUsage};

/// Ollama serves the OpenAI wire format under `/v1`.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    model: String,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Client for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            api_key,
            temperature: None,
            max_tokens: None,
            http_client: reqwest::Client::new(),
        }
    }

    /// Applies a request timeout to every completion call.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    /// Sampling defaults used when a request does not set its own.
    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn role_to_string(role: &Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn build_messages(request: &LlmRequest) -> Vec<OpenAiMessage> {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system_prompt {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        for msg in &request.messages {
            messages.push(OpenAiMessage {
                role: Self::role_to_string(&msg.role).to_string(),
                content: msg.content.clone(),
            });
        }
        messages
    }

    fn build_request_body(&self, request: &LlmRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: Self::build_messages(request),
            temperature: request.temperature.or(self.temperature),
            max_tokens: request.max_tokens.or(self.max_tokens),
        }
    }
}

fn map_send_error(e: reqwest::Error) -> RagError {
    if e.is_connect() {
        RagError::ModelUnavailable(format!("Chat endpoint unreachable: {e}"))
    } else if e.is_timeout() {
        RagError::GenerationFailed(format!("Chat request timed out: {e}"))
    } else {
        RagError::GenerationFailed(format!("Chat request failed: {e}"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        debug!(model = %self.model, messages = body.messages.len(), "Sending chat completion");

        let mut http_req = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req.send().await.map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::GenerationFailed(format!(
                "Chat API error {status}: {body_text}"
            )));
        }

        let oai_response: OpenAiResponse = response.json().await.map_err(|e| {
            RagError::GenerationFailed(format!("Failed to parse chat response: {e}"))
        })?;

        let choice = oai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::GenerationFailed("No choices in chat response".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content,
            model: oai_response.model,
            usage: oai_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
