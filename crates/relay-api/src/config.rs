use config::{Config as ConfigLoader, ConfigError, Environment, File};
use relay_types::RelayConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub mongodb: MongoDbConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default)]
    pub mongodb_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    pub database: String,
}

impl Default for MongoDbConfig {
    fn default() -> Self {
        Self {
            database: "relay".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Pause/resume cycles allowed per run
    pub max_tool_rounds: usize,
    /// Upper bound on one request, setup plus streaming
    pub request_timeout_secs: u64,
    /// Generate chat titles with a completion instead of truncating
    pub llm_titles: bool,
    pub title_model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            request_timeout_secs: 60,
            llm_titles: false,
            title_model: "gpt-4.1-nano".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the caller identity, set by the upstream gateway
    pub user_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_header: "x-user-id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed with `RELAY_`, sections separated
    ///    by `__` (e.g. `RELAY_SERVER__PORT=9000`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.openai_api_key = required_env("OPENAI_API_KEY")?;
        cfg.assistant_id = required_env("ASSISTANT_ID")?;
        cfg.mongodb_uri = std::env::var("MONGODB_URI").ok().filter(|uri| !uri.is_empty());

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Checks that settings which depend on each other agree
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Mongodb && self.mongodb_uri.is_none() {
            return Err(ConfigError::Message(
                "MONGODB_URI environment variable is required for the mongodb storage backend"
                    .to_string(),
            ));
        }
        if self.assistant.max_tool_rounds == 0 {
            return Err(ConfigError::Message(
                "assistant.max_tool_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::default()
            .with_max_tool_rounds(self.assistant.max_tool_rounds)
            .with_timeout(Duration::from_secs(self.assistant.request_timeout_secs))
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Message(format!("{} environment variable is required", name)))
}
