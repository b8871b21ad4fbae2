//! Context builder for assembling agent prompts

use memagent_provider::{Message, ToolCallDef};

/// Prepends the system instruction to a thread's history for each turn.
/// The instruction itself is never stored.
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build complete messages list for the model
    pub fn build_messages(&self, history: Vec<Message>, current_message: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(history);
        messages.push(Message::user(current_message));
        messages
    }

    /// Add a tool result to messages
    pub fn add_tool_result(
        messages: &mut Vec<Message>,
        tool_call_id: &str,
        name: &str,
        result: &str,
    ) {
        messages.push(Message::tool(tool_call_id, name, result));
    }

    /// Add an assistant message that requests tool calls
    pub fn add_assistant_message(
        messages: &mut Vec<Message>,
        content: Option<&str>,
        tool_calls: Vec<ToolCallDef>,
    ) {
        messages.push(Message::assistant_with_tools(content, tool_calls));
    }
}
