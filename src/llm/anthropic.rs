//! Anthropic direct API adapter (Claude models)

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{CouncilError, Result};
use crate::llm::models::ModelNormalizer;
use crate::llm::provider::{
    build_transport, connection, read_json, Adapter, AdapterKind, Message, QueryResult, Role,
    Transport,
};

pub const ANTHROPIC_MODELS: ModelNormalizer = ModelNormalizer {
    vendor_prefix: "anthropic/",
    bare_prefixes: &["claude-"],
    mappings: &[
        ("anthropic/claude-3.5-sonnet", "claude-sonnet-4-20250514"),
        ("anthropic/claude-3-opus", "claude-3-opus-20240229"),
        ("anthropic/claude-3-sonnet", "claude-3-sonnet-20240229"),
        ("anthropic/claude-3-haiku", "claude-3-haiku-20240307"),
        ("anthropic/claude-sonnet-4.5", "claude-sonnet-4-20250514"),
        ("anthropic/claude-3.5-sonnet-20241022", "claude-3-5-sonnet-20241022"),
    ],
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicAdapter {
    transport: Transport,
    config: ProviderConfig,
    api_key: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

/// Every block shape a non-tool message reply can carry
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Thinking { thinking: String },
    RedactedThinking {},
}

impl<'a> AnthropicRequest<'a> {
    /// System turns move to the `system` field; the rest keep their order
    fn new(model: &'a str, max_tokens: u32, messages: &'a [Message]) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        Self {
            model,
            max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        }
    }
}

impl AnthropicResponse {
    /// An empty block list is a valid, empty answer
    fn into_result(self) -> QueryResult {
        let mut text = String::new();
        let mut thinking = Vec::new();
        for block in self.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::Thinking { thinking: t } => {
                    thinking.push(serde_json::json!({"type": "thinking", "thinking": t}))
                }
                ContentBlock::RedactedThinking {} => {
                    thinking.push(serde_json::json!({"type": "redacted_thinking"}))
                }
            }
        }

        QueryResult {
            content: Some(text),
            reasoning_detail: (!thinking.is_empty()).then(|| serde_json::Value::Array(thinking)),
        }
    }
}

impl AnthropicAdapter {
    pub fn new(config: ProviderConfig, api_key: Option<String>) -> Self {
        Self {
            transport: build_transport(),
            config,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Adapter for AnthropicAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Anthropic
    }

    fn is_available(&self) -> bool {
        self.unavailable_reason().is_none()
    }

    fn unavailable_reason(&self) -> Option<CouncilError> {
        connection(self.kind(), self.api_key.as_deref(), &self.transport).err()
    }

    fn matches_model(&self, model: &str) -> bool {
        ANTHROPIC_MODELS.matches(model)
    }

    fn normalize_model(&self, model: &str) -> String {
        ANTHROPIC_MODELS.normalize(model)
    }

    fn known_models(&self) -> Vec<String> {
        ANTHROPIC_MODELS.known_models()
    }

    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<QueryResult> {
        let (client, api_key) = connection(self.kind(), self.api_key.as_deref(), &self.transport)?;
        let model = self.normalize_model(model);
        let request = AnthropicRequest::new(
            &model,
            self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
        );

        let url = format!("{}/messages", self.config.endpoint);
        let response = client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        let body: AnthropicResponse = read_json(response).await?;
        Ok(body.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(endpoint: &str) -> AnthropicAdapter {
        AnthropicAdapter::new(
            ProviderConfig {
                endpoint: endpoint.to_string(),
                api_key: String::new(),
                max_tokens: None,
            },
            Some("test-key".to_string()),
        )
    }

    #[test]
    fn test_system_message_becomes_side_field() {
        let messages = vec![Message::system("You are terse."), Message::user("Hi")];
        let request = AnthropicRequest::new("claude-3-opus-20240229", 4096, &messages);

        assert_eq!(request.system.as_deref(), Some("You are terse."));
        assert_eq!(
            request.messages,
            vec![AnthropicMessage {
                role: "user",
                content: "Hi"
            }]
        );
    }

    #[test]
    fn test_no_system_field_without_system_message() {
        let messages = vec![
            Message::user("Hi"),
            Message::assistant("Hello"),
            Message::user("Again"),
        ];
        let request = AnthropicRequest::new("claude-3-haiku-20240307", 4096, &messages);

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"].as_array().unwrap().len(), 3);
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_normalize_model() {
        let claude = adapter("http://unused");
        assert_eq!(
            claude.normalize_model("anthropic/claude-3.5-sonnet"),
            "claude-sonnet-4-20250514"
        );
        assert_eq!(
            claude.normalize_model("anthropic/claude-sonnet-4-20250514"),
            "claude-sonnet-4-20250514"
        );
        assert_eq!(claude.normalize_model("claude-3-opus-20240229"), "claude-3-opus-20240229");
    }

    #[test]
    fn test_unknown_block_type_fails_closed() {
        let parsed = serde_json::from_value::<AnthropicResponse>(json!({
            "content": [{"type": "tool_use", "id": "t1", "name": "x", "input": {}}]
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_thinking_blocks_become_reasoning_detail() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "sig"},
                {"type": "text", "text": "Hello, "},
                {"type": "text", "text": "world"}
            ]
        }))
        .unwrap();

        let result = response.into_result();
        assert_eq!(result.content.as_deref(), Some("Hello, world"));
        assert_eq!(
            result.reasoning_detail,
            Some(json!([{"type": "thinking", "thinking": "hmm"}]))
        );
    }

    #[test]
    fn test_empty_content_is_empty_answer() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [],
            "stop_reason": "end_turn"
        }))
        .unwrap();

        assert_eq!(response.into_result(), QueryResult::text(""));
    }

    #[tokio::test]
    async fn test_query_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_json(json!({
                "model": "claude-3-opus-20240229",
                "max_tokens": 4096,
                "system": "Be kind.",
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_test",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": "Hello from Claude!"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let result = adapter(&server.uri())
            .query(
                "anthropic/claude-3-opus",
                &[Message::system("Be kind."), Message::user("Hello")],
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(result, QueryResult::text("Hello from Claude!"));
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"completion": "old"})))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri())
            .query("claude-3-haiku", &[Message::user("Hello")], Duration::from_secs(5))
            .await;

        assert!(matches!(outcome, Err(CouncilError::MalformedResponse(_))));
    }
}
