use std::sync::Arc;
use std::time::Duration;

use ragdemo_common::{RagError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::LlmClient;
use crate::openai::{OLLAMA_BASE_URL, OPENAI_BASE_URL, OpenAiClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" (local) or "openai" (cloud)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Messages kept by the conversation memory window
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,
}

fn default_provider() -> String {
    "ollama".into()
}

fn default_model() -> String {
    "tinyllama".into()
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_memory_window() -> usize {
    20
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            api_url: None,
            temperature: None,
            max_tokens: None,
            timeout_ms: default_timeout_ms(),
            memory_window: default_memory_window(),
        }
    }
}

pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let (base_url, api_key) = match config.provider.as_str() {
        "ollama" => (
            config.api_url.clone().unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            config.api_key.clone(),
        ),
        "openai" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                RagError::Config("OpenAI requires an API key".to_string())
            })?;
            (
                config.api_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
                Some(api_key),
            )
        }
        other => {
            return Err(RagError::Config(format!("Unknown LLM provider: {other}")));
        }
    };

    if config.timeout_ms == 0 {
        return Err(RagError::Config("chat timeout_ms must be positive".to_string()));
    }

    info!(
        provider = %config.provider,
        model = %config.model,
        base_url = %base_url,
        "Building chat model client"
    );

    let client = OpenAiClient::new(Some(base_url), config.model.clone(), api_key)
        .with_sampling(config.temperature, config.max_tokens)
        .with_timeout(Duration::from_millis(config.timeout_ms))?;

    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
provider = "ollama"
model = "llama3"
api_url = "http://localhost:11434"
temperature = 0.3
timeout_ms = 5000
memory_window = 10
"#;

    #[test]
    fn deserialize_config_from_toml() {
        let config: LlmConfig = toml::from_str(TOML_CONFIG).unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:11434"));
        assert!(config.api_key.is_none());
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.memory_window, 10);
    }

    #[test]
    fn deserialize_config_defaults() {
        let config: LlmConfig = toml::from_str("").unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "tinyllama");
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(config.memory_window, 20);
    }

    #[test]
    fn build_ollama_client() {
        let client = build_llm_client(&LlmConfig::default()).unwrap();
        assert_eq!(client.model_name(), "tinyllama");
    }

    #[test]
    fn build_openai_client() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let client = build_llm_client(&config).unwrap();
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn build_openai_without_key_fails() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            ..Default::default()
        };
        assert!(matches!(build_llm_client(&config), Err(RagError::Config(_))));
    }

    #[test]
    fn build_unknown_provider_fails() {
        let config = LlmConfig {
            provider: "gemini".to_string(),
            ..Default::default()
        };
        assert!(build_llm_client(&config).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = LlmConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(build_llm_client(&config).is_err());
    }
}
