//! The set of adapters a process routes through

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::config::{Config, ANTHROPIC, GOOGLE, OPENAI, OPENROUTER};
use crate::llm::anthropic::AnthropicAdapter;
use crate::llm::gemini::GeminiAdapter;
use crate::llm::openai::OpenAiAdapter;
use crate::llm::provider::Adapter;
use crate::llm::relay::RelayAdapter;
use crate::llm::router::OperatingMode;

static GLOBAL: OnceLock<Arc<AdapterRegistry>> = OnceLock::new();

/// One adapter per transport; availability is fixed when each is built
pub struct AdapterRegistry {
    /// In routing priority order
    direct: Vec<Arc<dyn Adapter>>,
    relay: Arc<dyn Adapter>,
}

/// Read-only diagnostic snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub providers: BTreeMap<String, bool>,
    pub mode: OperatingMode,
    /// Canonical ids each available adapter knows by name
    pub models: BTreeMap<String, Vec<String>>,
}

impl AdapterRegistry {
    /// `direct` is consulted in the given order
    pub fn new(direct: Vec<Arc<dyn Adapter>>, relay: Arc<dyn Adapter>) -> Self {
        Self { direct, relay }
    }

    /// Build the OpenAI, Anthropic, Google and OpenRouter adapters
    pub fn from_config(config: &Config) -> Self {
        let openai = OpenAiAdapter::new(config.provider(OPENAI), config.resolve_api_key(OPENAI));
        let anthropic =
            AnthropicAdapter::new(config.provider(ANTHROPIC), config.resolve_api_key(ANTHROPIC));
        let google = GeminiAdapter::new(config.provider(GOOGLE), config.resolve_api_key(GOOGLE));
        let relay =
            RelayAdapter::new(config.provider(OPENROUTER), config.resolve_api_key(OPENROUTER));

        let direct: Vec<Arc<dyn Adapter>> =
            vec![Arc::new(openai), Arc::new(anthropic), Arc::new(google)];
        let registry = Self::new(direct, Arc::new(relay));
        for adapter in registry.all() {
            tracing::debug!(
                adapter = %adapter.kind(),
                available = adapter.is_available(),
                "adapter constructed"
            );
        }
        registry
    }

    /// Process-wide registry, built once from environment credentials
    pub fn global() -> Arc<AdapterRegistry> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::from_config(&Config::default())))
            .clone()
    }

    pub fn direct(&self) -> &[Arc<dyn Adapter>] {
        &self.direct
    }

    pub fn relay(&self) -> &Arc<dyn Adapter> {
        &self.relay
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.direct.iter().chain(std::iter::once(&self.relay))
    }

    pub fn status(&self, mode: OperatingMode) -> ProviderStatus {
        let providers = self
            .all()
            .map(|a| (a.kind().name().to_string(), a.is_available()))
            .collect();

        let models = self
            .all()
            .filter(|a| a.is_available())
            .map(|a| (a.kind().name().to_string(), a.known_models()))
            .collect();

        ProviderStatus {
            providers,
            mode,
            models,
        }
    }
}
