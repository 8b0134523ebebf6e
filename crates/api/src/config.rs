//! Application configuration loaded from TOML.

use std::path::Path;

use ragdemo_common::{RagError, Result};
use ragdemo_llm::LlmConfig;
use ragdemo_rag::{IngestConfig, RetrievalConfig};
use ragdemo_store::{EmbeddingConfig, StoreConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Every section is optional; missing ones take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chat: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix the file must be a regular file and must not be
    /// world-writable. A warning is logged once when the parsed config
    /// holds an API key.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        let permission_bits = Some(validate_config_file_permissions(path)?);
        #[cfg(not(unix))]
        let permission_bits = None;

        let content = std::fs::read_to_string(path).map_err(|e| {
            RagError::Config(format!("Failed to read config file '{}': {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;

        if let Some(message) = api_key_warning(path, config.chat.api_key.is_some(), permission_bits)
        {
            warn!("{message}");
        }

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RagError::Config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Fills the chat API key from `OPENAI_API_KEY` when the OpenAI provider
    /// is selected and no key is configured.
    pub fn with_env(mut self) -> Self {
        self.fill_api_key(std::env::var("OPENAI_API_KEY").ok());
        self
    }

    fn fill_api_key(&mut self, env_key: Option<String>) {
        let missing = self.chat.api_key.as_deref().is_none_or(str::is_empty);
        if self.chat.provider == "openai" && missing {
            self.chat.api_key = env_key.filter(|k| !k.is_empty());
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.ingest.splitter()?;
        if self.embedding.dimension == 0 {
            return Err(RagError::Config("embedding dimension must be positive".into()));
        }
        if self.retrieval.max_results == 0 {
            return Err(RagError::Config("retrieval max_results must be positive".into()));
        }
        if self.chat.memory_window == 0 {
            return Err(RagError::Config("chat memory_window must be positive".into()));
        }
        Ok(())
    }
}

/// Warning for a config file that holds an API key, naming the fix when
/// other users can read it.
fn api_key_warning(
    path: &Path,
    has_api_key: bool,
    permission_bits: Option<u32>,
) -> Option<String> {
    if !has_api_key {
        return None;
    }
    Some(match permission_bits {
        Some(bits) if bits & 0o004 != 0 => format!(
            "Config file '{}' contains an API key and is world-readable (mode {bits:04o}). \
             Restrict access with: chmod 600 {}, or use the OPENAI_API_KEY environment variable.",
            path.display(),
            path.display()
        ),
        _ => format!(
            "API key found in config file '{}'. Prefer the OPENAI_API_KEY environment variable.",
            path.display()
        ),
    })
}

/// Returns the file's permission bits once it passes the checks.
#[cfg(unix)]
fn validate_config_file_permissions(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| {
        RagError::Config(format!("Failed to read config file '{}': {e}", path.display()))
    })?;

    if !metadata.is_file() {
        return Err(RagError::Config(format!(
            "Config path '{}' is not a regular file",
            path.display()
        )));
    }

    let permission_bits = metadata.permissions().mode() & 0o777;
    if permission_bits & 0o002 != 0 {
        return Err(RagError::Config(format!(
            "Config file '{}' is world-writable (mode {permission_bits:04o}). Fix with: chmod o-w {}",
            path.display(),
            path.display()
        )));
    }

    Ok(permission_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdemo_store::{CreateOption, EmbeddingProvider, StoreBackend};

    const FULL_CONFIG: &str = r#"
[chat]
provider = "ollama"
model = "llama3"
temperature = 0.2
memory_window = 10

[embedding]
provider = "ollama"
model = "all-minilm"
dimension = 384
api_url = "http://localhost:11434"

[store]
backend = "memory"
create_option = "create_if_not_exists"

[ingest]
document = "https://example.com/report.html"
max_segment_chars = 500
overlap_chars = 50

[retrieval]
max_results = 5
min_score = 0.6
"#;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.chat.provider, "ollama");
        assert_eq!(config.chat.model, "tinyllama");
        assert_eq!(config.chat.memory_window, 20);
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.store.table, "profile_embeddings");
        assert_eq!(config.store.create_option, CreateOption::CreateOrReplace);
        assert_eq!(config.ingest.max_segment_chars, 300);
        assert_eq!(config.ingest.overlap_chars, 30);
        assert_eq!(config.retrieval.max_results, 3);
    }

    #[test]
    fn parses_every_section() {
        let config = AppConfig::from_toml(FULL_CONFIG).unwrap();
        assert_eq!(config.chat.model, "llama3");
        assert_eq!(config.chat.temperature, Some(0.2));
        assert_eq!(config.chat.memory_window, 10);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.create_option, CreateOption::CreateIfNotExists);
        assert_eq!(config.ingest.document, "https://example.com/report.html");
        assert_eq!(config.ingest.max_segment_chars, 500);
        assert_eq!(config.retrieval.max_results, 5);
        assert!((config.retrieval.min_score - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn example_config_parses() {
        let config = AppConfig::from_toml(include_str!("../../../ragdemo.example.toml")).unwrap();
        assert_eq!(config.chat.max_tokens, Some(512));
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn rejects_bad_splitter_settings() {
        let err = AppConfig::from_toml("[ingest]\nmax_segment_chars = 30\noverlap_chars = 30")
            .unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            AppConfig::from_toml("[chat\nmodel = 1"),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn env_key_fills_only_missing_openai_key() {
        let mut config = AppConfig::from_toml("[chat]\nprovider = \"openai\"").unwrap();
        config.fill_api_key(Some("sk-env".into()));
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-env"));

        let mut configured =
            AppConfig::from_toml("[chat]\nprovider = \"openai\"\napi_key = \"sk-file\"").unwrap();
        configured.fill_api_key(Some("sk-env".into()));
        assert_eq!(configured.chat.api_key.as_deref(), Some("sk-file"));

        let mut local = AppConfig::default();
        local.fill_api_key(Some("sk-env".into()));
        assert!(local.chat.api_key.is_none());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ragdemo.toml");
        std::fs::write(&path, FULL_CONFIG).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.chat.model, "llama3");
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = AppConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn key_warning_depends_on_parsed_key() {
        let path = Path::new("ragdemo.toml");
        assert_eq!(api_key_warning(path, false, Some(0o644)), None);
        assert_eq!(api_key_warning(path, false, None), None);

        let private = api_key_warning(path, true, Some(0o600)).unwrap();
        assert!(private.contains("OPENAI_API_KEY"));
        assert!(!private.contains("world-readable"));

        let shared = api_key_warning(path, true, Some(0o644)).unwrap();
        assert!(shared.contains("world-readable (mode 0644)"));
        assert!(shared.contains("chmod 600"));
    }

    #[cfg(unix)]
    #[test]
    fn readable_example_config_has_no_key() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ragdemo.toml");
        std::fs::write(&path, include_str!("../../../ragdemo.example.toml")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert!(config.chat.api_key.is_none());
        assert_eq!(validate_config_file_permissions(&path).unwrap(), 0o644);
        assert_eq!(api_key_warning(&path, config.chat.api_key.is_some(), Some(0o644)), None);
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_writable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ragdemo.toml");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o666)).unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(RagError::Config(_))
        ));
    }
}
