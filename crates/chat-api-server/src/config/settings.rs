use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config/settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub company: CompanyConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// "development" attaches raw error text to failure responses
    pub env: String,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.env.eq_ignore_ascii_case("development")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    /// Falls back to MISTRAL_API_KEY when unset
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Turns kept in a conversation history (user + assistant messages)
    pub max_history_messages: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationConfig {
    pub default_language: String,
    /// 0 = unbounded
    pub max_conversations: usize,
    /// 0 = never expire
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl ConversationConfig {
    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.idle_ttl_secs > 0).then(|| Duration::from_secs(self.idle_ttl_secs))
    }

    pub fn capacity(&self) -> Option<usize> {
        (self.max_conversations > 0).then_some(self.max_conversations)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CompanyConfig {
    /// JSON file with company facts and pricing tables; built-in data when unset
    #[serde(default)]
    pub data_path: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Defaults, then `path` if it exists, then `APP__*` environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        if settings.llm.api_key.as_deref().map_or(true, str::is_empty) {
            settings.llm.api_key = std::env::var("MISTRAL_API_KEY").ok();
        }
        Ok(settings)
    }

    /// Builder pre-seeded with defaults for every key
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("app.env", "production")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("llm.base_url", "https://api.mistral.ai")?
            .set_default("llm.model", "mistral-small-latest")?
            .set_default("llm.timeout_seconds", 30)?
            .set_default("llm.max_tokens", 800)?
            .set_default("llm.temperature", 0.7)?
            .set_default("llm.max_history_messages", 20)?
            .set_default("conversation.default_language", "english")?
            .set_default("conversation.max_conversations", 10_000)?
            .set_default("conversation.idle_ttl_secs", 6 * 60 * 60)?
            .set_default("conversation.sweep_interval_secs", 300)
    }

    /// The settings file `load` reads, when it is present
    pub fn config_file() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE);
        path.is_file().then_some(path)
    }

    pub fn company_data_path(&self) -> Option<PathBuf> {
        self.company
            .data_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}
