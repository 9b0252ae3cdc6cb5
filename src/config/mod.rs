//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, EmbeddingSettings, LlmSettings, LogFormat, LoggingConfig, ServerConfig,
    StoreSettings, WebSearchSettings, API_KEY_ENV,
};
