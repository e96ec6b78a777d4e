//! LLM backend adapters, routing and council fan-out

mod anthropic;
mod council;
mod gemini;
mod models;
mod openai;
mod openai_compat;
mod provider;
mod registry;
mod relay;
mod router;

pub use anthropic::*;
pub use council::*;
pub use gemini::*;
pub use models::*;
pub use openai::*;
pub use provider::*;
pub use registry::*;
pub use relay::*;
pub use router::*;
