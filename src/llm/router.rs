//! Model-to-adapter routing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::CouncilError;
use crate::llm::provider::{Adapter, Message, QueryOutcome, DEFAULT_TIMEOUT};
use crate::llm::registry::{AdapterRegistry, ProviderStatus};

/// Environment variable consulted on every dispatch
pub const MODE_ENV: &str = "LLM_MODE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Each model goes to its vendor's own API when possible
    Direct,
    /// Every model goes through OpenRouter
    #[default]
    #[serde(alias = "openrouter")]
    Relay,
}

impl FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(OperatingMode::Direct),
            "relay" | "openrouter" => Ok(OperatingMode::Relay),
            other => Err(format!("Unknown LLM mode: {}", other)),
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Direct => f.write_str("direct"),
            OperatingMode::Relay => f.write_str("relay"),
        }
    }
}

/// Shared, mutable mode flag for callers that switch modes in-process
#[derive(Debug, Clone, Default)]
pub struct ModeSwitch(Arc<AtomicBool>);

impl ModeSwitch {
    pub fn new(mode: OperatingMode) -> Self {
        let switch = Self::default();
        switch.set(mode);
        switch
    }

    pub fn set(&self, mode: OperatingMode) {
        self.0.store(mode == OperatingMode::Relay, Ordering::SeqCst);
    }

    pub fn get(&self) -> OperatingMode {
        if self.0.load(Ordering::SeqCst) {
            OperatingMode::Relay
        } else {
            OperatingMode::Direct
        }
    }
}

/// Where the router reads the mode from at dispatch time
#[derive(Debug, Clone)]
pub enum ModeSource {
    /// `LLM_MODE`, falling back to the configured mode when unset or invalid
    Environment { fallback: OperatingMode },
    Switch(ModeSwitch),
}

impl ModeSource {
    pub fn current(&self) -> OperatingMode {
        match self {
            ModeSource::Environment { fallback } => match std::env::var(MODE_ENV) {
                Ok(raw) => raw.parse::<OperatingMode>().unwrap_or_else(|e: String| {
                    warn!(error = %e, fallback = %fallback, "ignoring {}", MODE_ENV);
                    *fallback
                }),
                Err(_) => *fallback,
            },
            ModeSource::Switch(switch) => switch.get(),
        }
    }
}

/// Picks one adapter per model and dispatches to it
pub struct Router {
    registry: Arc<AdapterRegistry>,
    mode: ModeSource,
    default_timeout: Duration,
}

impl Router {
    pub fn new(registry: Arc<AdapterRegistry>, mode: ModeSource) -> Self {
        Self {
            registry,
            mode,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Mode as of this call
    pub fn mode(&self) -> OperatingMode {
        self.mode.current()
    }

    /// Deterministic in (model, mode, availability):
    /// relay mode always picks the relay; direct mode tries OpenAI, Anthropic
    /// and Google in that order and falls back to an available relay.
    pub fn select_adapter(&self, model: &str, mode: OperatingMode) -> Option<Arc<dyn Adapter>> {
        if mode == OperatingMode::Relay {
            return Some(self.registry.relay().clone());
        }

        if let Some(adapter) = self
            .registry
            .direct()
            .iter()
            .find(|a| a.supports_model(model))
        {
            return Some(adapter.clone());
        }

        let relay = self.registry.relay();
        relay.is_available().then(|| relay.clone())
    }

    pub async fn query(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> QueryOutcome {
        let mode = self.mode();
        let Some(adapter) = self.select_adapter(model, mode) else {
            let err = CouncilError::NoRouteFound(model.to_string());
            warn!(model, mode = %mode, error = %err, "no route");
            return Err(err);
        };

        debug!(model, mode = %mode, adapter = %adapter.kind(), "routed");
        adapter.query(model, messages, timeout).await
    }

    /// [`Router::query`] with the router's default timeout
    pub async fn query_default(&self, model: &str, messages: &[Message]) -> QueryOutcome {
        self.query(model, messages, self.default_timeout).await
    }

    pub fn status(&self) -> ProviderStatus {
        self.registry.status(self.mode())
    }
}
