//! Conversational agent with per-thread memory

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use memagent_config::Config;
use memagent_provider::{
    ChatParams, Message, Provider, ToolCallDef, ToolChoice, ROLE_ASSISTANT, ROLE_SYSTEM,
    ROLE_TOOL, ROLE_USER,
};
use memagent_session::ConversationStore;

use crate::context::ContextBuilder;
use crate::locks::ThreadLocks;
use crate::tools::{default_registry, ToolInfo, ToolRegistry};
use crate::{AgentError, Result};

/// Reply used when the model ends a turn without any text
pub const NO_RESPONSE: &str = "No response could be generated";

/// A tool call requested by the model during a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub name: String,
    pub args: Value,
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub response: String,
    pub thread_id: String,
    /// Messages stored for the thread after this turn
    pub message_count: usize,
    /// Calls made during this turn only
    pub tools_used: Vec<ToolUse>,
}

/// A tool call as shown in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// One stored message in its external shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<HistoryToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Message> for HistoryMessage {
    fn from(msg: &Message) -> Self {
        let kind = match msg.role.as_str() {
            ROLE_USER => "human",
            ROLE_ASSISTANT => "ai",
            ROLE_TOOL => "tool",
            ROLE_SYSTEM => "system",
            other => other,
        };
        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|c| HistoryToolCall {
                    id: c.id.clone(),
                    name: c.function.name.clone(),
                    args: c.function.arguments.clone(),
                })
                .collect()
        });

        Self {
            kind: kind.to_string(),
            content: msg.text().to_string(),
            tool_calls,
            name: msg.name.clone(),
        }
    }
}

/// What the HTTP layer needs from an agent
#[async_trait]
pub trait ConversationAgent: Send + Sync {
    async fn chat(&self, message: &str, thread_id: &str) -> Result<ChatOutcome>;

    /// Full ordered history; empty for unknown threads or on store failure
    async fn get_conversation_history(&self, thread_id: &str) -> Vec<HistoryMessage>;

    async fn clear_conversation(&self, thread_id: &str) -> Result<bool>;

    fn tool_catalog(&self) -> Vec<ToolInfo>;
}

/// Runs the generate / dispatch loop and keeps one history per thread id
pub struct MemoryAgent<P: Provider> {
    provider: Arc<P>,
    store: Arc<dyn ConversationStore>,
    tools: ToolRegistry,
    context: ContextBuilder,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_iterations: u32,
    locks: ThreadLocks,
}

impl<P: Provider> MemoryAgent<P> {
    pub fn new(provider: P, store: Arc<dyn ConversationStore>, config: &Config) -> Self {
        Self {
            provider: Arc::new(provider),
            store,
            tools: default_registry(),
            context: ContextBuilder::new(&config.agent.system_prompt),
            model: config.model.model.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            max_iterations: config.agent.max_tool_iterations,
            locks: ThreadLocks::new(),
        }
    }

    /// Replace the tool set
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one turn on `thread_id`. Nothing is stored unless the turn
    /// completes.
    pub async fn chat(&self, message: &str, thread_id: &str) -> Result<ChatOutcome> {
        let turn = self.locks.lock(thread_id).await;
        let outcome = self.run_turn(message, thread_id).await;
        drop(turn);
        self.locks.release(thread_id).await;
        outcome
    }

    async fn run_turn(&self, message: &str, thread_id: &str) -> Result<ChatOutcome> {
        info!("Turn on thread {}", thread_id);
        debug!("Content: {}", message.chars().take(100).collect::<String>());

        let history = self.store.read(thread_id).await?;
        let mut messages = self.context.build_messages(history, message);
        let turn_start = messages.len() - 1;

        let (response, tools_used) = self.run_agent_loop(&mut messages).await?;

        let turn = messages.split_off(turn_start);
        let message_count = self.store.append(thread_id, turn).await?;
        debug!(
            "Thread {} stored {} messages, {} tool calls this turn",
            thread_id,
            message_count,
            tools_used.len()
        );

        Ok(ChatOutcome {
            response,
            thread_id: thread_id.to_string(),
            message_count,
            tools_used,
        })
    }

    /// Generate until the model answers without tool calls
    async fn run_agent_loop(&self, messages: &mut Vec<Message>) -> Result<(String, Vec<ToolUse>)> {
        let mut tools_used = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;
            if iteration > self.max_iterations {
                warn!("Turn gave up after {} generate steps", self.max_iterations);
                return Err(AgentError::MaxIterations(self.max_iterations));
            }

            debug!("Agent iteration {}", iteration);

            let params = ChatParams {
                model: self.model.clone(),
                messages: messages.clone(),
                tools: self.tools.definitions(),
                tool_choice: ToolChoice::Auto,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let response = self.provider.chat(params).await?;

            if !response.has_tool_calls() {
                let reply = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| NO_RESPONSE.to_string());
                messages.push(Message::assistant(&reply));
                return Ok((reply, tools_used));
            }

            let defs: Vec<ToolCallDef> =
                response.tool_calls.iter().map(ToolCallDef::from).collect();
            ContextBuilder::add_assistant_message(messages, response.content.as_deref(), defs);

            for call in &response.tool_calls {
                debug!("Executing tool: {}", call.name);
                tools_used.push(ToolUse {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                });

                let result = match self.tools.execute(&call.name, call.arguments.clone()).await {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        debug!("Tool {} failed: {}", call.name, e);
                        format!("Error: {}", e)
                    }
                };
                ContextBuilder::add_tool_result(messages, &call.id, &call.name, &result);
            }
        }
    }

    pub async fn get_conversation_history(&self, thread_id: &str) -> Vec<HistoryMessage> {
        match self.store.read(thread_id).await {
            Ok(messages) => messages.iter().map(HistoryMessage::from).collect(),
            Err(e) => {
                warn!("Could not read thread {}: {}", thread_id, e);
                Vec::new()
            }
        }
    }

    /// Drop the thread's history; the next turn starts fresh
    pub async fn clear_conversation(&self, thread_id: &str) -> Result<bool> {
        let turn = self.locks.lock(thread_id).await;
        let removed = self.store.clear(thread_id).await;
        drop(turn);
        self.locks.release(thread_id).await;

        let removed = removed?;
        info!("Cleared thread {} (had history: {})", thread_id, removed);
        Ok(removed)
    }

    pub fn tool_catalog(&self) -> Vec<ToolInfo> {
        self.tools.catalog()
    }
}

#[async_trait]
impl<P: Provider + 'static> ConversationAgent for MemoryAgent<P> {
    async fn chat(&self, message: &str, thread_id: &str) -> Result<ChatOutcome> {
        MemoryAgent::chat(self, message, thread_id).await
    }

    async fn get_conversation_history(&self, thread_id: &str) -> Vec<HistoryMessage> {
        MemoryAgent::get_conversation_history(self, thread_id).await
    }

    async fn clear_conversation(&self, thread_id: &str) -> Result<bool> {
        MemoryAgent::clear_conversation(self, thread_id).await
    }

    fn tool_catalog(&self) -> Vec<ToolInfo> {
        MemoryAgent::tool_catalog(self)
    }
}
