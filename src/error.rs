//! Error types for the council routing layer

use thiserror::Error;

/// Why a council member produced no answer.
///
/// Every variant collapses to a Failure outcome at the adapter boundary; the
/// variant only exists so logs and callers can tell the causes apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouncilError {
    #[error("No API key configured for {0}")]
    CredentialMissing(String),

    #[error("Transport for {adapter} unavailable: {reason}")]
    TransportUnavailable { adapter: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No available provider for model {0}")]
    NoRouteFound(String),

    #[error("Council member task aborted: {0}")]
    TaskAborted(String),
}

impl From<reqwest::Error> for CouncilError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not carry the bound; `Adapter::query` fills it in
            CouncilError::Timeout(std::time::Duration::ZERO)
        } else if err.is_decode() {
            CouncilError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            CouncilError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            CouncilError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CouncilError {
    fn from(err: serde_json::Error) -> Self {
        CouncilError::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CouncilError>;
