//! Arithmetic agent with conversation memory
//!
//! `MemoryAgent` composes the prompt from a thread's stored history, runs
//! the generate / tool-dispatch loop against a `Provider`, and appends the
//! finished turn to a `ConversationStore`.

use thiserror::Error;

pub mod context;
pub mod locks;
pub mod memory_agent;
pub mod tools;

pub use context::ContextBuilder;
pub use locks::ThreadLocks;
pub use memory_agent::{
    ChatOutcome, ConversationAgent, HistoryMessage, HistoryToolCall, MemoryAgent, ToolUse,
    NO_RESPONSE,
};
pub use tools::{default_registry, ToolError, ToolInfo, ToolRegistry, ToolTrait};

/// Turn failures. Tool errors are not here: they go back to the model.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("model service error: {0}")]
    Provider(#[from] memagent_provider::ProviderError),

    #[error("conversation store error: {0}")]
    Store(#[from] memagent_session::StoreError),

    #[error("no final answer after {0} generate steps")]
    MaxIterations(u32),
}

pub type Result<T> = std::result::Result<T, AgentError>;
