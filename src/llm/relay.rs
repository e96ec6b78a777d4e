//! OpenRouter relay adapter, the catch-all transport

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{CouncilError, Result};
use crate::llm::openai_compat::{ChatRequest, ChatResponse};
use crate::llm::provider::{
    build_transport, connection, read_json, Adapter, AdapterKind, Message, QueryResult, Transport,
};

pub struct RelayAdapter {
    transport: Transport,
    config: ProviderConfig,
    api_key: Option<String>,
}

impl RelayAdapter {
    pub fn new(config: ProviderConfig, api_key: Option<String>) -> Self {
        Self {
            transport: build_transport(),
            config,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Adapter for RelayAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::OpenRouter
    }

    fn is_available(&self) -> bool {
        self.unavailable_reason().is_none()
    }

    fn unavailable_reason(&self) -> Option<CouncilError> {
        connection(self.kind(), self.api_key.as_deref(), &self.transport).err()
    }

    /// OpenRouter serves every model
    fn matches_model(&self, _model: &str) -> bool {
        true
    }

    /// Canonical ids are already OpenRouter ids
    fn normalize_model(&self, model: &str) -> String {
        model.to_string()
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
        body.into_result("OpenRouter")
    }
}
