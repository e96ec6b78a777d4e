//! Canonical message types and the adapter trait every transport implements

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CouncilError, Result};

/// Default per-call bound for a council member query
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the conversation shared by every council member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Canonical answer shape produced by every adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_detail: Option<serde_json::Value>,
}

impl QueryResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            reasoning_detail: None,
        }
    }
}

/// Success or failure of one model query; never both
pub type QueryOutcome = Result<QueryResult>;

/// The four transports a model can be reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    OpenAi,
    Anthropic,
    Google,
    OpenRouter,
}

impl AdapterKind {
    pub fn name(&self) -> &'static str {
        match self {
            AdapterKind::OpenAi => crate::config::OPENAI,
            AdapterKind::Anthropic => crate::config::ANTHROPIC,
            AdapterKind::Google => crate::config::GOOGLE,
            AdapterKind::OpenRouter => crate::config::OPENROUTER,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One backend transport.
///
/// Implementations translate canonical messages into their wire format in
/// [`Adapter::send`]; callers use [`Adapter::query`], which adds the
/// availability check, the timeout bound and failure logging.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Fixed at construction
    fn is_available(&self) -> bool;

    /// Why a query would short-circuit; `None` when available
    fn unavailable_reason(&self) -> Option<CouncilError> {
        (!self.is_available())
            .then(|| CouncilError::CredentialMissing(self.kind().name().to_string()))
    }

    /// Whether the id follows this transport's naming convention
    fn matches_model(&self, model: &str) -> bool;

    /// Transport-native model name for a canonical id
    fn normalize_model(&self, model: &str) -> String;

    /// Canonical ids this adapter knows by name
    fn known_models(&self) -> Vec<String> {
        Vec::new()
    }

    fn supports_model(&self, model: &str) -> bool {
        self.is_available() && self.matches_model(model)
    }

    /// Issue the call; errors are reported, not logged
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<QueryResult>;

    async fn query(&self, model: &str, messages: &[Message], timeout: Duration) -> QueryOutcome {
        let outcome = if let Some(reason) = self.unavailable_reason() {
            Err(reason)
        } else {
            debug!(model, adapter = %self.kind(), "dispatching query");
            match tokio::time::timeout(timeout, self.send(model, messages, timeout)).await {
                Ok(Err(CouncilError::Timeout(_))) | Err(_) => {
                    Err(CouncilError::Timeout(timeout))
                }
                Ok(result) => result,
            }
        };

        if let Err(e) = &outcome {
            warn!(model, adapter = %self.kind(), error = %e, "model query failed");
        }
        outcome
    }
}

/// HTTP client, or why one could not be built
pub(crate) type Transport = std::result::Result<Client, String>;

pub(crate) fn build_transport() -> Transport {
    Client::builder().build().map_err(|e| e.to_string())
}

/// Client and credential for a call, or the reason the adapter cannot make
/// one; a missing credential takes precedence over a missing transport
pub(crate) fn connection<'a>(
    kind: AdapterKind,
    api_key: Option<&'a str>,
    transport: &'a Transport,
) -> Result<(&'a Client, &'a str)> {
    match (api_key, transport) {
        (Some(key), Ok(client)) => Ok((client, key)),
        (None, _) => Err(CouncilError::CredentialMissing(kind.name().to_string())),
        (Some(_), Err(reason)) => Err(CouncilError::TransportUnavailable {
            adapter: kind.name().to_string(),
            reason: reason.clone(),
        }),
    }
}

/// Check the status and decode a JSON body, keeping the two failure kinds apart
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = String::from_utf8_lossy(&body);
        return Err(CouncilError::Http {
            status: status.as_u16(),
            message: truncate(&message, 500).to_string(),
        });
    }

    Ok(serde_json::from_slice(&body)?)
}

/// Truncate on a char boundary
fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowAdapter {
        available: bool,
    }

    #[async_trait::async_trait]
    impl Adapter for SlowAdapter {
        fn kind(&self) -> AdapterKind {
            AdapterKind::OpenAi
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn matches_model(&self, model: &str) -> bool {
            model.starts_with("gpt-")
        }

        fn normalize_model(&self, model: &str) -> String {
            model.to_string()
        }

        async fn send(
            &self,
            _model: &str,
            _messages: &[Message],
            _timeout: Duration,
        ) -> Result<QueryResult> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(QueryResult::text("too late"))
        }
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_supports_model_requires_availability() {
        assert!(SlowAdapter { available: true }.supports_model("gpt-4o"));
        assert!(!SlowAdapter { available: false }.supports_model("gpt-4o"));
        assert!(!SlowAdapter { available: true }.supports_model("claude-3"));
    }

    #[tokio::test]
    async fn test_unavailable_adapter_short_circuits() {
        let adapter = SlowAdapter { available: false };
        let started = std::time::Instant::now();

        let outcome = adapter.query("gpt-4o", &[Message::user("hi")], DEFAULT_TIMEOUT).await;

        assert_eq!(outcome, Err(CouncilError::CredentialMissing("openai".to_string())));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let adapter = SlowAdapter { available: true };
        let bound = Duration::from_millis(50);

        let outcome = adapter.query("gpt-4o", &[Message::user("hi")], bound).await;

        assert_eq!(outcome, Err(CouncilError::Timeout(bound)));
    }

    #[test]
    fn test_connection_reports_missing_credential_first() {
        let broken: Transport = Err("no TLS backend".to_string());

        assert_eq!(
            connection(AdapterKind::Google, None, &broken).err(),
            Some(CouncilError::CredentialMissing("google".to_string()))
        );
        assert_eq!(
            connection(AdapterKind::Google, Some("key"), &broken).err(),
            Some(CouncilError::TransportUnavailable {
                adapter: "google".to_string(),
                reason: "no TLS backend".to_string(),
            })
        );
        assert!(connection(AdapterKind::Google, Some("key"), &build_transport()).is_ok());
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 50), "short");
    }
}
