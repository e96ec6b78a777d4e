//! Configuration management for the LLM council

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::OperatingMode;

/// Provider names as they appear in the config file and in status reports
pub const OPENAI: &str = "openai";
pub const ANTHROPIC: &str = "anthropic";
pub const GOOGLE: &str = "google";
pub const OPENROUTER: &str = "openrouter";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Routing mode used when `LLM_MODE` is not set
    #[serde(default)]
    pub mode: OperatingMode,

    /// LLM provider configurations
    pub providers: HashMap<String, ProviderConfig>,

    /// Council membership settings
    pub council: CouncilConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API endpoint URL
    pub endpoint: String,

    /// API key (can be env var reference like $OPENAI_API_KEY)
    pub api_key: String,

    /// Max tokens for responses (only forwarded where the API requires it)
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilConfig {
    /// Canonical model ids queried each round
    pub models: Vec<String>,

    /// Model that synthesizes the final answer
    pub chairman: String,

    /// Per-member request timeout
    pub timeout_secs: u64,

    /// Optional bound on a whole round; stragglers are aborted when it expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_deadline_secs: Option<u64>,
}

impl CouncilConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn round_deadline(&self) -> Option<Duration> {
        self.round_deadline_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            OPENAI.to_string(),
            ProviderConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: "$OPENAI_API_KEY".to_string(),
                max_tokens: None,
            },
        );

        providers.insert(
            ANTHROPIC.to_string(),
            ProviderConfig {
                endpoint: "https://api.anthropic.com/v1".to_string(),
                api_key: "$ANTHROPIC_API_KEY".to_string(),
                max_tokens: Some(4096),
            },
        );

        providers.insert(
            GOOGLE.to_string(),
            ProviderConfig {
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: "$GOOGLE_API_KEY".to_string(),
                max_tokens: None,
            },
        );

        providers.insert(
            OPENROUTER.to_string(),
            ProviderConfig {
                endpoint: "https://openrouter.ai/api/v1".to_string(),
                api_key: "$OPENROUTER_API_KEY".to_string(),
                max_tokens: None,
            },
        );

        Self {
            mode: OperatingMode::default(),
            providers,
            council: CouncilConfig {
                models: vec![
                    "openai/gpt-4o".to_string(),
                    "google/gemini-2.5-flash".to_string(),
                    "anthropic/claude-sonnet-4-20250514".to_string(),
                ],
                chairman: "google/gemini-2.5-flash".to_string(),
                timeout_secs: 120,
                round_deadline_secs: None,
            },
        }
    }
}

impl Config {
    /// Load config from file or create default, then apply env overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path(),
        };

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("llm-council")
            .join("config.toml")
    }

    /// Apply `COUNCIL_MODELS` and `CHAIRMAN_MODEL` from the environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(models) = std::env::var("COUNCIL_MODELS") {
            let models = parse_model_list(&models);
            if !models.is_empty() {
                self.council.models = models;
            }
        }

        if let Ok(chairman) = std::env::var("CHAIRMAN_MODEL") {
            let chairman = chairman.trim();
            if !chairman.is_empty() {
                self.council.chairman = chairman.to_string();
            }
        }
    }

    /// Resolve API key from config (handles env var references)
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        self.providers.get(provider).and_then(|p| {
            if let Some(var) = p.api_key.strip_prefix('$') {
                std::env::var(var).ok().filter(|key| !key.is_empty())
            } else if p.api_key.is_empty() {
                None
            } else {
                Some(p.api_key.clone())
            }
        })
    }

    /// Provider settings, falling back to the built-in defaults for that name
    pub fn provider(&self, name: &str) -> ProviderConfig {
        self.providers
            .get(name)
            .cloned()
            .or_else(|| Config::default().providers.remove(name))
            .unwrap_or_else(|| ProviderConfig {
                endpoint: String::new(),
                api_key: String::new(),
                max_tokens: None,
            })
    }
}

/// Split a comma-separated model list, trimming whitespace and dropping blanks
pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
