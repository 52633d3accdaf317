use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{AgentError, AgentResult};

/// A tool that can be used by a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool, unique within one request
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A JSON Schema object defining the expected parameters for the tool
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool call request that the model asked us to execute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The parameters for the execution
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new ToolCall with the given name and parameters
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// How the model may pick among the offered tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides whether to call a tool
    Auto,
    /// The model must call one of the tools
    Any,
    /// The model must not call tools
    None,
    /// The model must call the named tool
    Tool(String),
}

/// The outcome of executing one tool call, fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success<S: Into<String>>(name: S, output: Value) -> Self {
        Self {
            name: name.into(),
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failure<S: Into<String>>(name: S, error: &AgentError) -> Self {
        Self {
            name: name.into(),
            success: false,
            output: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_outcome<S: Into<String>>(name: S, outcome: AgentResult<Value>) -> Self {
        match outcome {
            Ok(output) => Self::success(name, output),
            Err(e) => Self::failure(name, &e),
        }
    }

    /// The JSON document the model sees, e.g. `{"success": true, "content": "..."}`
    /// or `{"success": false, "error": "..."}`. Object outputs are flattened in.
    pub fn payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("success".to_string(), json!(self.success));
        match &self.output {
            Some(Value::Object(fields)) => {
                for (key, value) in fields {
                    payload.insert(key.clone(), value.clone());
                }
            }
            Some(other) => {
                payload.insert("output".to_string(), other.clone());
            }
            None => {}
        }
        if let Some(error) = &self.error {
            payload.insert("error".to_string(), json!(error));
        }
        Value::Object(payload)
    }
}
