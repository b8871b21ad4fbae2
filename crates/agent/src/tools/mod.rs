//! Callable tools and the registry the agent dispatches through

pub mod math;

pub use math::{Arithmetic, MathTool, Operation};

use async_trait::async_trait;
use memagent_provider::Tool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Tool failures. These are reported back to the model, never to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Cannot divide by zero")]
    DivisionByZero,

    #[error("Result of {0} does not fit in a 64-bit integer")]
    Overflow(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool '{0}' not found")]
    NotFound(String),
}

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;
    /// Human-readable parameter list, e.g. `["a: int", "b: int"]`
    fn signature(&self) -> Vec<String>;
    fn returns(&self) -> &str;
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

pub fn to_provider_tool(tool: &dyn ToolTrait) -> Tool {
    Tool::new(tool.name(), tool.description(), tool.parameters())
}

/// Catalog entry as served by `GET /tools`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Vec<String>,
    pub returns: String,
}

impl ToolInfo {
    fn from_tool(tool: &dyn ToolTrait) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.signature(),
            returns: tool.returns().to_string(),
        }
    }
}

/// Name to tool map; listing follows registration order
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn ordered(&self) -> impl Iterator<Item = &(dyn ToolTrait + Send + Sync)> {
        self.order.iter().filter_map(|name| self.get(name))
    }

    pub fn definitions(&self) -> Vec<Tool> {
        self.ordered().map(|t| to_provider_tool(t)).collect()
    }

    pub fn catalog(&self) -> Vec<ToolInfo> {
        self.ordered().map(|t| ToolInfo::from_tool(t)).collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with `add`, `multiply` and `divide`
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for op in Operation::ALL {
        registry.register(MathTool::new(op));
    }
    registry
}
