//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files: bind address, database path, embedding
//! dimension, generation backends, fetcher options, and retrieval limits.
//! API keys can also come from the environment (`OPENAI_API_KEY`,
//! `GROQ_API_KEY`), which takes precedence over the file.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Invalid field value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// SQLite database path (":memory:" for ephemeral)
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Generation backend settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Page fetcher settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Retrieval settings
    #[serde(default)]
    pub rag: RagConfig,
}

/// Generation backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Routing policy: "auto", "primary" (openai first) or "fallback" (groq only)
    #[serde(default = "default_policy")]
    pub policy: String,

    /// OpenAI API key; empty disables the backend
    #[serde(default)]
    pub openai_api_key: String,

    /// OpenAI model
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// OpenAI endpoint base URL (proxies, compatible servers)
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Groq API key; empty disables the backend
    #[serde(default)]
    pub groq_api_key: String,

    /// Groq model
    #[serde(default = "default_groq_model")]
    pub groq_model: String,

    /// Groq endpoint base URL
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,
}

/// Page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// User agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout (seconds)
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

/// Retrieval configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    /// Pages retrieved as context per query
    #[serde(default = "default_max_context_items")]
    pub max_context_items: usize,
}

fn default_database_path() -> String {
    "magpie.db".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_policy() -> String {
    "auto".to_string()
}

fn default_openai_model() -> String {
    magpie_llm::OpenAiBackend::DEFAULT_MODEL.to_string()
}

fn default_openai_base_url() -> String {
    magpie_llm::OpenAiBackend::DEFAULT_BASE_URL.to_string()
}

fn default_groq_model() -> String {
    magpie_llm::GroqBackend::DEFAULT_MODEL.to_string()
}

fn default_groq_base_url() -> String {
    magpie_llm::GroqBackend::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    magpie_fetcher::DEFAULT_USER_AGENT.to_string()
}

fn default_fetch_timeout() -> u64 {
    magpie_fetcher::DEFAULT_TIMEOUT_SECS
}

fn default_max_context_items() -> usize {
    magpie_rag::DEFAULT_MAX_CONTEXT_ITEMS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            groq_api_key: String::new(),
            groq_model: default_groq_model(),
            groq_base_url: default_groq_base_url(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_context_items: default_max_context_items(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file, applying environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ServerConfig = toml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Pull API keys from the environment, overriding file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.llm.openai_api_key = key;
            }
        }
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            if !key.is_empty() {
                self.llm.groq_api_key = key;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue(
                "embedding_dimension must be greater than 0".to_string(),
            ));
        }
        if !matches!(self.llm.policy.as_str(), "auto" | "primary" | "fallback") {
            return Err(ConfigError::InvalidValue(format!(
                "unknown llm policy: {}",
                self.llm.policy
            )));
        }
        Ok(())
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            database_path: ":memory:".to_string(),
            embedding_dimension: 384,
            llm: LlmConfig::default(),
            fetcher: FetcherConfig::default(),
            rag: RagConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.llm.policy, "auto");
        assert_eq!(config.rag.max_context_items, 5);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            database_path = "crawl.db"
            embedding_dimension = 256

            [llm]
            policy = "fallback"
            groq_api_key = "gsk-test"

            [fetcher]
            timeout_secs = 10

            [rag]
            max_context_items = 3
        "#;

        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.database_path, "crawl.db");
        assert_eq!(config.embedding_dimension, 256);
        assert_eq!(config.llm.policy, "fallback");
        assert_eq!(config.llm.groq_api_key, "gsk-test");
        assert_eq!(config.fetcher.timeout_secs, 10);
        assert_eq!(config.rag.max_context_items, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let mut config = ServerConfig::default_test_config();
        config.llm.policy = "roulette".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let toml = r#"
            bind_address = "127.0.0.1"
            bind_port = 8080
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.database_path, "magpie.db");
        assert_eq!(config.llm.policy, "auto");
        assert!(config.llm.openai_api_key.is_empty());
    }
}
