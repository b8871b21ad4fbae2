//! Request and response bodies

use memagent_agent::{ChatOutcome, HistoryMessage, ToolInfo, ToolUse};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_THREAD_ID: &str = "default";

fn default_thread_id() -> String {
    DEFAULT_THREAD_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.message.trim().is_empty() {
            return Err(ApiError::Validation(
                "message: must contain at least 1 character".to_string(),
            ));
        }
        if self.thread_id.is_empty() {
            return Err(ApiError::Validation(
                "thread_id: must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: String,
    pub message_count: usize,
    #[serde(default)]
    pub tools_used: Vec<ToolUse>,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            response: outcome.response,
            thread_id: outcome.thread_id,
            message_count: outcome.message_count,
            tools_used: outcome.tools_used,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistoryResponse {
    pub thread_id: String,
    pub messages: Vec<HistoryMessage>,
    pub message_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent_ready: bool,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolInfo>,
}
