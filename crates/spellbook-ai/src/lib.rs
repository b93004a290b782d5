//! Rules assistant: answers rules questions with an LLM, grounded in the
//! stored rule records.
//!
//! Conversation state lives in a caller-owned [`SessionStore`]; nothing here
//! keeps history between calls on its own.

mod assistant;
mod error;
mod llm;
pub mod prompt;
mod session;

pub use assistant::{Answer, DEFAULT_CONTEXT_RULES, RulesAssistant};
pub use error::AiError;
pub use llm::LlmClient;
pub use session::{ChatSession, ChatTurn, DEFAULT_MAX_TURNS, Role, SessionStore};

#[cfg(feature = "http")]
pub use llm::{AnthropicClient, DEFAULT_ANTHROPIC_URL, DEFAULT_MODEL};
