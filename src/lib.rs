//! LLM Council - pose one prompt to several LLM backends at once
//!
//! Each model id is routed to a vendor API (OpenAI, Anthropic, Google) or
//! to the OpenRouter relay, queried with a bounded timeout, and its answer
//! normalized into a [`llm::QueryResult`]. [`llm::Council`] fans a prompt
//! out to many models and keeps every member's outcome separate.

pub mod config;
pub mod error;
pub mod llm;

pub use config::Config;
pub use error::{CouncilError, Result};
pub use llm::{
    AdapterRegistry, Council, CouncilResponses, Message, OperatingMode, ProviderStatus,
    QueryOutcome, QueryResult, Role, Router,
};
