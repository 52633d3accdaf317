use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::ToolExecutor;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

/// Descriptors for the built-in `read_file` and `write_file` tools
pub fn file_tools() -> Vec<Tool> {
    let read_file = Tool::new(
        "read_file",
        "Read content from a file",
        json!({
            "type": "object",
            "required": ["path"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to read"
                }
            }
        }),
    );

    let write_file = Tool::new(
        "write_file",
        "Write content to a file",
        json!({
            "type": "object",
            "required": ["path", "content"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            }
        }),
    );

    vec![read_file, write_file]
}

/// Reads and writes files by path. `~` and paths starting with `~/` are
/// expanded against the home directory.
pub struct FileTools {
    tools: Vec<Tool>,
    home: Option<String>,
}

impl Default for FileTools {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTools {
    pub fn new() -> Self {
        let home = dirs::home_dir().map(|p| p.to_string_lossy().into_owned());
        Self {
            tools: file_tools(),
            home,
        }
    }

    /// Use a fixed home directory for `~` expansion
    pub fn with_home_dir<P: AsRef<Path>>(mut self, home: P) -> Self {
        self.home = Some(home.as_ref().to_string_lossy().into_owned());
        self
    }

    fn resolve_path(&self, path_str: &str) -> AgentResult<PathBuf> {
        if path_str.is_empty() {
            return Err(AgentError::InvalidParameters("'path' must not be empty".into()));
        }
        let needs_home = path_str == "~" || path_str.starts_with("~/");
        if needs_home && self.home.is_none() {
            return Err(AgentError::ExecutionError(
                "failed to get home directory".into(),
            ));
        }
        let expanded = shellexpand::tilde_with_context(path_str, || self.home.as_deref());
        Ok(PathBuf::from(expanded.as_ref()))
    }

    fn string_param<'a>(params: &'a Value, key: &str) -> AgentResult<&'a str> {
        params.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
            AgentError::InvalidParameters(format!("Missing '{}' parameter", key))
        })
    }

    async fn read_file(&self, params: Value) -> AgentResult<Value> {
        let path = self.resolve_path(Self::string_param(&params, "path")?)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AgentError::ExecutionError(format!("failed to read file: {}", e)))?;

        Ok(json!({ "content": content }))
    }

    async fn write_file(&self, params: Value) -> AgentResult<Value> {
        let path = self.resolve_path(Self::string_param(&params, "path")?)?;
        let content = Self::string_param(&params, "content")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AgentError::ExecutionError(format!("failed to create directories: {}", e))
            })?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AgentError::ExecutionError(format!("failed to write file: {}", e)))?;

        Ok(json!({
            "path": path.display().to_string(),
            "bytes_written": content.len(),
        }))
    }
}

#[async_trait]
impl ToolExecutor for FileTools {
    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Value> {
        if !tool_call.arguments.is_object() {
            return Err(AgentError::InvalidParameters(format!(
                "invalid input for {}: expected a JSON object",
                tool_call.name
            )));
        }
        tracing::debug!(tool = %tool_call.name, "dispatching tool call");
        match tool_call.name.as_str() {
            "read_file" => self.read_file(tool_call.arguments).await,
            "write_file" => self.write_file(tool_call.arguments).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tools_in(dir: &TempDir) -> FileTools {
        FileTools::new().with_home_dir(dir.path())
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let tools = tools_in(&temp_dir);
        let file_path = temp_dir.path().join("notes.txt");
        let file_path_str = file_path.to_str().unwrap();

        let written = tools
            .call(ToolCall::new(
                "write_file",
                json!({"path": file_path_str, "content": "buy milk"}),
            ))
            .await
            .unwrap();
        assert_eq!(written["bytes_written"], 8);

        let read = tools
            .call(ToolCall::new("read_file", json!({"path": file_path_str})))
            .await
            .unwrap();
        assert_eq!(read["content"], "buy milk");
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let tools = tools_in(&temp_dir);

        tools
            .call(ToolCall::new(
                "write_file",
                json!({"path": "~/deep/nested/dir/file.txt", "content": "x"}),
            ))
            .await
            .unwrap();

        let on_disk = std::fs::read_to_string(temp_dir.path().join("deep/nested/dir/file.txt")).unwrap();
        assert_eq!(on_disk, "x");
    }

    #[tokio::test]
    async fn test_tilde_expands_to_home() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("todo.txt"), "ship it").unwrap();

        let result = tools_in(&temp_dir)
            .execute(ToolCall::new("read_file", json!({"path": "~/todo.txt"})))
            .await;

        assert!(result.success);
        assert_eq!(result.payload(), json!({"success": true, "content": "ship it"}));
    }

    #[tokio::test]
    async fn test_tilde_user_path_does_not_need_home() {
        let tools = FileTools {
            tools: file_tools(),
            home: None,
        };

        let result = tools
            .execute(ToolCall::new("read_file", json!({"path": "~alice/x"})))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("failed to read file"));

        let result = tools
            .execute(ToolCall::new("read_file", json!({"path": "~/x"})))
            .await;
        assert!(result.error.unwrap().contains("failed to get home directory"));
    }

    #[tokio::test]
    async fn test_missing_file_is_captured() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = tools_in(&temp_dir)
            .execute(ToolCall::new("read_file", json!({"path": "~/absent.txt"})))
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("failed to read file"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let temp_dir = tempfile::tempdir().unwrap();
        let tools = tools_in(&temp_dir);

        let error = tools
            .call(ToolCall::new("delete_universe", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(error, AgentError::ToolNotFound(ref name) if name == "delete_universe"));

        let result = tools.execute(ToolCall::new("delete_universe", json!({}))).await;
        assert!(!result.success);
        assert!(!result.error.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_parameters() {
        let temp_dir = tempfile::tempdir().unwrap();
        let tools = tools_in(&temp_dir);

        let error = tools
            .call(ToolCall::new("write_file", json!({"path": "~/a.txt"})))
            .await
            .unwrap_err();
        assert!(matches!(error, AgentError::InvalidParameters(_)));

        let error = tools
            .call(ToolCall::new("read_file", json!("{not an object")))
            .await
            .unwrap_err();
        assert!(matches!(error, AgentError::InvalidParameters(_)));
    }

    #[test]
    fn test_descriptors() {
        let tools = file_tools();
        assert_eq!(tools[0].name, "read_file");
        assert_eq!(tools[0].input_schema["required"], json!(["path"]));
        assert_eq!(tools[1].input_schema["required"], json!(["path", "content"]));
    }
}
