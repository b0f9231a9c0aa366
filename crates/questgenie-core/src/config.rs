//! Configuration types for QuestGenie.
//!
//! Settings come from an optional `questgenie.json`; every field has a
//! default. The API key itself never lives in the file: the config only
//! names the environment variable it is read from.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use questgenie_llm::ClientSettings;
use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "questgenie.json";

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    256
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8501
}

const fn default_session_idle_secs() -> u64 {
    3600
}

/// Main configuration for QuestGenie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root URL of the chat-completion API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for every prompt.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature, between 0 and 2.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on tokens generated per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Interface the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP server binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds a session may go untouched before it is discarded.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key_env: default_api_key_env(),
            host: default_host(),
            port: default_port(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `questgenie.json` exists but is invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            QuizError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads `questgenie.json` from a specific directory, or defaults if absent.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ConfigParseError` for unreadable files or invalid
    /// JSON, and `QuizError::ConfigValidationError` for out-of-range values.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(QuizError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| QuizError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(QuizError::config_validation(
                format!("baseUrl must be an http(s) URL, got '{}'", self.base_url),
                "Set baseUrl to something like https://api.openai.com/v1 in your questgenie.json",
            ));
        }

        if self.model.trim().is_empty() {
            return Err(QuizError::config_validation(
                "model must not be empty",
                "Provide a model name such as gpt-4o-mini in your questgenie.json",
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(QuizError::config_validation(
                format!("temperature must be between 0 and 2, got {}", self.temperature),
                "Set temperature to a value between 0 and 2 in your questgenie.json",
            ));
        }

        if self.max_tokens == 0 {
            return Err(QuizError::config_validation(
                "maxTokens must be greater than 0",
                "Set maxTokens to at least 1 in your questgenie.json",
            ));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(QuizError::config_validation(
                "apiKeyEnv must not be empty",
                "Name the environment variable holding the key, e.g. OPENAI_API_KEY",
            ));
        }

        if self.host.parse::<IpAddr>().is_err() {
            return Err(QuizError::config_validation(
                format!("host must be an IP address, got '{}'", self.host),
                "Use 127.0.0.1 for local use or 0.0.0.0 to listen on all interfaces",
            ));
        }

        if self.session_idle_secs == 0 {
            return Err(QuizError::config_validation(
                "sessionIdleSecs must be greater than 0",
                "Set sessionIdleSecs to at least 1 in your questgenie.json",
            ));
        }

        Ok(())
    }

    /// How long an untouched session is kept.
    #[must_use]
    pub const fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            QuizError::config_validation(
                format!("host must be an IP address, got '{}'", self.host),
                "Use 127.0.0.1 for local use or 0.0.0.0 to listen on all interfaces",
            )
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Reads the API key from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::MissingApiKey` if the variable is unset or blank.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Reads the API key through `lookup`, which maps a variable name to its value.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        lookup(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| QuizError::missing_api_key(&self.api_key_env))
    }

    /// Builds completion-client settings around a resolved key.
    #[must_use]
    pub fn client_settings(&self, api_key: String) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            api_key,
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
