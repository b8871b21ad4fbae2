use memagent_agent::{default_registry, ConversationAgent, ToolInfo};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::ApiError;

/// Shared handler state. The agent slot is filled once; until then every
/// agent-backed route answers 503.
#[derive(Clone)]
pub struct AppState {
    agent: Arc<OnceCell<Arc<dyn ConversationAgent>>>,
    catalog: Arc<Vec<ToolInfo>>,
}

impl AppState {
    /// State with no agent yet
    pub fn new() -> Self {
        Self {
            agent: Arc::new(OnceCell::new()),
            catalog: Arc::new(default_registry().catalog()),
        }
    }

    /// State that is ready immediately
    pub fn with_agent(agent: Arc<dyn ConversationAgent>) -> Self {
        let state = Self::new();
        state.set_agent(agent);
        state
    }

    /// Install the agent. Returns false if one was already installed.
    pub fn set_agent(&self, agent: Arc<dyn ConversationAgent>) -> bool {
        self.agent.set(agent).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.agent.initialized()
    }

    pub fn agent(&self) -> Result<Arc<dyn ConversationAgent>, ApiError> {
        self.agent
            .get()
            .cloned()
            .ok_or_else(|| ApiError::NotReady("Agent is not available".to_string()))
    }

    /// The installed agent's tools, or the default set before readiness
    pub fn catalog(&self) -> Vec<ToolInfo> {
        match self.agent.get() {
            Some(agent) => agent.tool_catalog(),
            None => self.catalog.as_ref().clone(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
