//! Integer arithmetic tools

use super::{ToolError, ToolTrait};
use async_trait::async_trait;
use memagent_provider::object_schema;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub fn add(a: i64, b: i64) -> Result<i64, ToolError> {
    a.checked_add(b)
        .ok_or_else(|| ToolError::Overflow(format!("{} + {}", a, b)))
}

pub fn multiply(a: i64, b: i64) -> Result<i64, ToolError> {
    a.checked_mul(b)
        .ok_or_else(|| ToolError::Overflow(format!("{} * {}", a, b)))
}

/// Always a float, even when the division is exact
pub fn divide(a: i64, b: i64) -> Result<f64, ToolError> {
    if b == 0 {
        return Err(ToolError::DivisionByZero);
    }
    Ok(a as f64 / b as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Add, Operation::Multiply, Operation::Divide];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Operation::Add => "Add two integers and return the sum.",
            Operation::Multiply => "Multiply two integers and return the product.",
            Operation::Divide => {
                "Divide a by b and return the quotient as a float. b must not be zero."
            }
        }
    }

    pub fn returns(self) -> &'static str {
        match self {
            Operation::Divide => "float",
            _ => "int",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| ToolError::NotFound(s.to_string()))
    }
}

/// A validated call: one operation and its two operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arithmetic {
    pub op: Operation,
    pub a: i64,
    pub b: i64,
}

impl Arithmetic {
    /// Check that `args` is exactly `{"a": int, "b": int}`
    pub fn parse(op: Operation, args: &Value) -> Result<Self, ToolError> {
        let obj = args.as_object().ok_or_else(|| {
            ToolError::InvalidArguments(format!("{} expects an object with a and b", op))
        })?;

        if let Some(extra) = obj.keys().find(|k| *k != "a" && *k != "b") {
            return Err(ToolError::InvalidArguments(format!(
                "unexpected argument '{}'",
                extra
            )));
        }

        Ok(Self {
            op,
            a: integer_arg(obj.get("a"), "a")?,
            b: integer_arg(obj.get("b"), "b")?,
        })
    }

    pub fn evaluate(&self) -> Result<Value, ToolError> {
        match self.op {
            Operation::Add => add(self.a, self.b).map(Value::from),
            Operation::Multiply => multiply(self.a, self.b).map(Value::from),
            Operation::Divide => divide(self.a, self.b).map(|q| json!(q)),
        }
    }
}

fn integer_arg(value: Option<&Value>, name: &str) -> Result<i64, ToolError> {
    let value =
        value.ok_or_else(|| ToolError::InvalidArguments(format!("missing argument '{}'", name)))?;

    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    // models often send 15.0 for 15
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(ToolError::InvalidArguments(format!(
            "argument '{}' must be an integer, got {}",
            name, value
        ))),
    }
}

/// One arithmetic operation exposed as a tool
pub struct MathTool {
    op: Operation,
}

impl MathTool {
    pub fn new(op: Operation) -> Self {
        Self { op }
    }
}

#[async_trait]
impl ToolTrait for MathTool {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn description(&self) -> &str {
        self.op.description()
    }

    fn parameters(&self) -> Value {
        let (a, b) = match self.op {
            Operation::Divide => ("Dividend", "Divisor, must not be zero"),
            _ => ("First integer", "Second integer"),
        };
        object_schema(vec![("a", "integer", a, true), ("b", "integer", b, true)])
    }

    fn signature(&self) -> Vec<String> {
        vec!["a: int".to_string(), "b: int".to_string()]
    }

    fn returns(&self) -> &str {
        self.op.returns()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let call = Arithmetic::parse(self.op, &args)?;
        let result = call.evaluate();
        debug!("{}({}, {}) -> {:?}", self.op, call.a, call.b, result);
        result
    }
}
