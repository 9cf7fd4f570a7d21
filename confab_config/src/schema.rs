use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Backend selector understood by the provider factory.
    #[serde(default = "Config::default_provider")]
    pub provider: String,
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub history: HistorySettings,
    /// Base directory for bare relative image references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base_dir: Option<PathBuf>,
    /// Capacity of the turn admission gate.
    #[serde(default = "Config::default_max_concurrent_turns")]
    pub max_concurrent_turns: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Self::default_provider(),
            ollama: OllamaSettings::default(),
            openai: OpenAiSettings::default(),
            history: HistorySettings::default(),
            image_base_dir: None,
            max_concurrent_turns: Self::default_max_concurrent_turns(),
        }
    }
}

impl Config {
    fn default_provider() -> String {
        "mock".to_string()
    }

    const fn default_max_concurrent_turns() -> usize {
        5
    }

    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(provider) = env_string("CONFAB_PROVIDER") {
            config.provider = provider;
        }
        if let Some(limit) = env_parsed("CONFAB_MAX_CONCURRENT") {
            config.max_concurrent_turns = limit;
        }
        if let Some(dir) = env_string("IMAGE_BASE_DIR") {
            config.image_base_dir = Some(PathBuf::from(dir));
        }
        config.ollama.apply_env();
        config.openai.apply_env();
        config.history.apply_env();
        config
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    #[must_use]
    pub const fn with_max_concurrent_turns(mut self, limit: usize) -> Self {
        self.max_concurrent_turns = limit;
        self
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaSettings {
    #[serde(default = "OllamaSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "OllamaSettings::default_model")]
    pub model: String,
    #[serde(default = "OllamaSettings::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl OllamaSettings {
    fn default_base_url() -> String {
        "http://localhost:11434".to_string()
    }

    fn default_model() -> String {
        "qwen2.5vl:3b".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }

    fn apply_env(&mut self) {
        if let Some(base_url) = env_string("OLLAMA_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = env_string("OLLAMA_MODEL") {
            self.model = model;
        }
        if let Some(timeout) = env_parsed("OLLAMA_TIMEOUT") {
            self.timeout_secs = timeout;
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiSettings {
    /// Required by the backend; its absence is a construction-time error
    /// there, not here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "OpenAiSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "OpenAiSettings::default_model")]
    pub model: String,
    #[serde(default = "OpenAiSettings::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl OpenAiSettings {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    fn default_model() -> String {
        "gpt-3.5-turbo".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }

    fn apply_env(&mut self) {
        if let Some(api_key) = env_string("OPENAI_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = env_string("OPENAI_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = env_string("OPENAI_MODEL") {
            self.model = model;
        }
        if let Some(timeout) = env_parsed("OPENAI_TIMEOUT") {
            self.timeout_secs = timeout;
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistorySettings {
    /// Directory conversation exports are written to; created on first
    /// use.
    #[serde(default = "HistorySettings::default_save_dir")]
    pub save_dir: PathBuf,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            save_dir: Self::default_save_dir(),
        }
    }
}

impl HistorySettings {
    fn default_save_dir() -> PathBuf {
        PathBuf::from("./conversations")
    }

    fn apply_env(&mut self) {
        if let Some(dir) = env_string("CONVERSATION_SAVE_PATH") {
            self.save_dir = PathBuf::from(dir);
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {key}={raw}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_select_mock_provider() {
        let config = Config::default();
        assert_eq!(config.provider, "mock");
        assert_eq!(config.max_concurrent_turns, 5);
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.history.save_dir, PathBuf::from("./conversations"));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"provider": "ollama", "ollama": {"model": "llava"}}"#)
                .unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.ollama.model, "llava");
        assert_eq!(config.ollama.timeout_secs, 30);
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
    }
}
