use serde::Deserialize;

use crate::domain::crag::CragConfig;
use crate::domain::ingestion::ChunkingConfig;
use crate::domain::DomainError;
use crate::infrastructure::observability::ObservabilityConfig;

/// Environment variable holding the provider key when `llm.api_key` is unset
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub crag: CragConfig,
    #[serde(default)]
    pub web_search: WebSearchSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Generation service settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// OpenAI-compatible endpoint; the public API when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// Embedding service settings
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Web search fallback settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_web_timeout")]
    pub timeout_secs: u64,
}

/// Passage store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_persist_directory")]
    pub persist_directory: String,
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_max_results() -> usize {
    3
}

fn default_web_timeout() -> u64 {
    10
}

fn default_persist_directory() -> String {
    "./chroma_db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: 0.0,
            max_tokens: None,
            base_url: None,
            api_key: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmSettings {
    /// Configured key, or the one from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            base_url: None,
        }
    }
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            max_results: default_max_results(),
            timeout_secs: default_web_timeout(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            persist_directory: default_persist_directory(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        self.crag.validate()?;
        self.observability.validate()?;
        self.chunking
            .validate()
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        if self.web_search.max_results == 0 {
            return Err(DomainError::configuration(
                "web_search.max_results must be at least 1",
            ));
        }

        Ok(())
    }
}
