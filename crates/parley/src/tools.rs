//! Local capabilities the model can ask us to run.

pub mod files;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolCall, ToolResult};

/// Executes tool calls by exact name against a closed set of tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// The tools offered to the model
    fn tools(&self) -> &[Tool];

    /// Run one call, returning its output or a typed failure
    async fn call(&self, tool_call: ToolCall) -> AgentResult<Value>;

    /// Run one call and capture any failure into the result, so the
    /// conversation can carry on with the model informed
    async fn execute(&self, tool_call: ToolCall) -> ToolResult {
        let name = tool_call.name.clone();
        let outcome = self.call(tool_call).await;
        if let Err(e) = &outcome {
            tracing::debug!(tool = %name, error = %e, "tool call failed");
        }
        ToolResult::from_outcome(name, outcome)
    }
}
