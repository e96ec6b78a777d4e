//! Google Gemini direct API adapter

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{CouncilError, Result};
use crate::llm::models::ModelNormalizer;
use crate::llm::provider::{
    build_transport, connection, read_json, Adapter, AdapterKind, Message, QueryResult, Role,
    Transport,
};

pub const GEMINI_MODELS: ModelNormalizer = ModelNormalizer {
    vendor_prefix: "google/",
    bare_prefixes: &["gemini-"],
    mappings: &[
        ("google/gemini-pro", "gemini-1.5-pro"),
        ("google/gemini-1.5-pro", "gemini-1.5-pro"),
        ("google/gemini-1.5-flash", "gemini-1.5-flash"),
        ("google/gemini-2.0-flash", "gemini-2.0-flash-exp"),
        ("google/gemini-3-pro-preview", "gemini-1.5-pro"),
    ],
};

/// Whether the Gemini transport was compiled in
const TRANSPORT_COMPILED: bool = cfg!(feature = "gemini");

pub struct GeminiAdapter {
    transport: Transport,
    config: ProviderConfig,
    api_key: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, PartialEq)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, PartialEq)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

/// Reply parts may be function calls or inline data instead of text
#[derive(Deserialize)]
struct GeminiReplyPart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiRequest {
    /// Gemini has no system role: system text is folded into the first user
    /// turn as `"{system}\n\n{user}"`, and `assistant` becomes `model`.
    fn new(messages: &[Message]) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let mut contents: Vec<GeminiContent> = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::System => return None,
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Some(GeminiContent {
                    role: role.to_string(),
                    parts: vec![GeminiPart {
                        text: m.content.clone(),
                    }],
                })
            })
            .collect();

        if !system.is_empty() {
            let system = system.join("\n\n");
            match contents.iter_mut().find(|c| c.role == "user") {
                Some(first_user) => {
                    let part = &mut first_user.parts[0];
                    part.text = format!("{}\n\n{}", system, part.text);
                }
                None => contents.insert(
                    0,
                    GeminiContent {
                        role: "user".to_string(),
                        parts: vec![GeminiPart { text: system }],
                    },
                ),
            }
        }

        Self { contents }
    }
}

impl GeminiResponse {
    fn into_result(self) -> Result<QueryResult> {
        let candidate = match self.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = self
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(CouncilError::MalformedResponse(format!(
                    "Gemini returned no answer: {}",
                    reason
                )));
            }
        };

        let content = candidate.content.ok_or_else(|| {
            CouncilError::MalformedResponse("Gemini candidate has no content".to_string())
        })?;

        if content.parts.is_empty() {
            return Ok(QueryResult::text(""));
        }

        let texts: Vec<String> = content.parts.into_iter().filter_map(|p| p.text).collect();
        if texts.is_empty() {
            return Err(CouncilError::MalformedResponse(
                "Gemini candidate has no text parts".to_string(),
            ));
        }
        Ok(QueryResult::text(texts.concat()))
    }
}

impl GeminiAdapter {
    pub fn new(config: ProviderConfig, api_key: Option<String>) -> Self {
        let transport = if TRANSPORT_COMPILED {
            build_transport()
        } else {
            Err("built without the `gemini` feature".to_string())
        };
        Self::with_transport(config, api_key, transport)
    }

    fn with_transport(
        config: ProviderConfig,
        api_key: Option<String>,
        transport: Transport,
    ) -> Self {
        Self {
            transport,
            config,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Adapter for GeminiAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Google
    }

    fn is_available(&self) -> bool {
        self.unavailable_reason().is_none()
    }

    fn unavailable_reason(&self) -> Option<CouncilError> {
        connection(self.kind(), self.api_key.as_deref(), &self.transport).err()
    }

    fn matches_model(&self, model: &str) -> bool {
        GEMINI_MODELS.matches(model)
    }

    fn normalize_model(&self, model: &str) -> String {
        GEMINI_MODELS.normalize(model)
    }

    fn known_models(&self) -> Vec<String> {
        GEMINI_MODELS.known_models()
    }

    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<QueryResult> {
        let (client, api_key) = connection(self.kind(), self.api_key.as_deref(), &self.transport)?;
        let model = self.normalize_model(model);
        let request = GeminiRequest::new(messages);

        let url = format!("{}/models/{}:generateContent", self.config.endpoint, model);
        let response = client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        let body: GeminiResponse = read_json(response).await?;
        body.into_result()
    }
}
