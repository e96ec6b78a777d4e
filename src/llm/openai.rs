//! OpenAI direct API adapter (GPT and o1 models)

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{CouncilError, Result};
use crate::llm::models::ModelNormalizer;
use crate::llm::openai_compat::{ChatRequest, ChatResponse};
use crate::llm::provider::{
    build_transport, connection, read_json, Adapter, AdapterKind, Message, QueryResult, Transport,
};

pub const OPENAI_MODELS: ModelNormalizer = ModelNormalizer {
    vendor_prefix: "openai/",
    bare_prefixes: &["gpt-", "o1"],
    mappings: &[
        ("openai/gpt-4o", "gpt-4o"),
        ("openai/gpt-4o-mini", "gpt-4o-mini"),
        ("openai/gpt-4-turbo", "gpt-4-turbo"),
        ("openai/gpt-4", "gpt-4"),
        ("openai/gpt-3.5-turbo", "gpt-3.5-turbo"),
        ("openai/o1", "o1"),
        ("openai/o1-mini", "o1-mini"),
        ("openai/o1-preview", "o1-preview"),
        ("openai/gpt-5.1", "gpt-4o"),
    ],
};

pub struct OpenAiAdapter {
    transport: Transport,
    config: ProviderConfig,
    api_key: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(config: ProviderConfig, api_key: Option<String>) -> Self {
        Self {
            transport: build_transport(),
            config,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Adapter for OpenAiAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::OpenAi
    }

    fn is_available(&self) -> bool {
        self.unavailable_reason().is_none()
    }

    fn unavailable_reason(&self) -> Option<CouncilError> {
        connection(self.kind(), self.api_key.as_deref(), &self.transport).err()
    }

    fn matches_model(&self, model: &str) -> bool {
        OPENAI_MODELS.matches(model)
    }

    fn normalize_model(&self, model: &str) -> String {
        OPENAI_MODELS.normalize(model)
    }

    fn known_models(&self) -> Vec<String> {
        OPENAI_MODELS.known_models()
    }

    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<QueryResult> {
        let (client, api_key) = connection(self.kind(), self.api_key.as_deref(), &self.transport)?;
        let model = self.normalize_model(model);
        let request = ChatRequest::new(&model, messages, self.config.max_tokens);

        let url = format!("{}/chat/completions", self.config.endpoint);
        let response = client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        let body: ChatResponse = read_json(response).await?;
        // OpenAI does not expose reasoning detail
        let mut result = body.into_result("OpenAI")?;
        result.reasoning_detail = None;
        Ok(result)
    }
}
