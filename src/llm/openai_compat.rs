//! Chat-completions wire format shared by OpenAI and OpenRouter

use serde::{Deserialize, Serialize};

use crate::error::{CouncilError, Result};
use crate::llm::provider::{Message, QueryResult};

#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
    #[serde(default)]
    reasoning_details: Option<serde_json::Value>,
}

impl<'a> ChatRequest<'a> {
    /// Role-tagged messages go through untouched
    pub fn new(model: &'a str, messages: &'a [Message], max_tokens: Option<u32>) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens,
        }
    }
}

impl ChatResponse {
    /// First choice as a canonical result
    pub fn into_result(self, provider: &str) -> Result<QueryResult> {
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            CouncilError::MalformedResponse(format!("No choices in {} response", provider))
        })?;

        Ok(QueryResult {
            content: choice.message.content,
            reasoning_detail: choice.message.reasoning_details,
        })
    }
}
