use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::message::Message;
use super::role::Role;
use super::tool::ToolCall;
use crate::providers::base::Usage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    ToolRequest,
}

/// One indexed unit of model output. Text blocks accumulate text deltas; tool
/// request blocks accumulate the raw JSON of the tool input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub kind: BlockKind,
    pub index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContentBlock {
    pub fn text<S: Into<String>>(index: usize, text: S) -> Self {
        Self {
            kind: BlockKind::Text,
            index,
            text: text.into(),
            id: None,
            name: None,
        }
    }

    pub fn tool_request<I, N, S>(index: usize, id: I, name: N, input_json: S) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            kind: BlockKind::ToolRequest,
            index,
            text: input_json.into(),
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    pub fn is_tool_request(&self) -> bool {
        self.kind == BlockKind::ToolRequest
    }

    /// Decode a tool request block into a call. An empty input means `{}`;
    /// input that is not valid JSON is passed through as a string so the tool
    /// executor can reject it and the model learns about it.
    pub fn tool_call(&self) -> Option<ToolCall> {
        if !self.is_tool_request() {
            return None;
        }
        let arguments = if self.text.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&self.text).unwrap_or_else(|_| Value::String(self.text.clone()))
        };
        Some(ToolCall::new(
            self.name.clone().unwrap_or_default(),
            arguments,
        ))
    }

    pub fn tool_request_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("call_{}", self.index))
    }
}

/// The result of one request/response cycle with a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            id: String::new(),
            model: None,
            role: Role::Assistant,
            content: Vec::new(),
            stop_reason: None,
            stop_sequence: None,
            usage: Usage::default(),
        }
    }
}

impl Response {
    /// All text block content, in block order
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == BlockKind::Text)
            .map(|block| block.text.as_str())
            .collect()
    }

    pub fn block(&self, index: usize) -> Option<&ContentBlock> {
        self.content.iter().find(|block| block.index == index)
    }

    pub fn has_tool_request(&self) -> bool {
        self.content.iter().any(ContentBlock::is_tool_request)
    }

    /// The assistant turn to append to the conversation for this response
    pub fn to_message(&self) -> Message {
        let mut message = Message::new(self.role);
        for block in &self.content {
            match block.kind {
                BlockKind::Text if !block.text.is_empty() => {
                    message = message.with_text(block.text.clone());
                }
                BlockKind::Text => {}
                BlockKind::ToolRequest => {
                    if let Some(call) = block.tool_call() {
                        message = message.with_tool_request(block.tool_request_id(), call);
                    }
                }
            }
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_from_block() {
        let block = ContentBlock::tool_request(1, "toolu_1", "read_file", r#"{"path": "~/a.txt"}"#);
        let call = block.tool_call().unwrap();
        assert_eq!(call.name, "read_file");
        assert_eq!(call.arguments, json!({"path": "~/a.txt"}));
    }

    #[test]
    fn test_tool_call_empty_and_invalid_input() {
        let empty = ContentBlock::tool_request(0, "t", "noop", "");
        assert_eq!(empty.tool_call().unwrap().arguments, json!({}));

        let broken = ContentBlock::tool_request(0, "t", "noop", "{oops");
        assert_eq!(broken.tool_call().unwrap().arguments, json!("{oops"));

        assert!(ContentBlock::text(0, "hi").tool_call().is_none());
    }

    #[test]
    fn test_to_message_skips_empty_text() {
        let response = Response {
            content: vec![
                ContentBlock::text(0, ""),
                ContentBlock::tool_request(1, "toolu_9", "write_file", r#"{"path":"x","content":"y"}"#),
            ],
            ..Default::default()
        };
        let message = response.to_message();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content.len(), 1);
        assert_eq!(message.tool_requests()[0].id, "toolu_9");
    }

    #[test]
    fn test_text_concatenates_text_blocks_only() {
        let response = Response {
            content: vec![
                ContentBlock::text(0, "Hi"),
                ContentBlock::tool_request(1, "t", "read_file", "{}"),
                ContentBlock::text(2, " there"),
            ],
            ..Default::default()
        };
        assert_eq!(response.text(), "Hi there");
        assert!(response.has_tool_request());
        assert_eq!(response.block(2).unwrap().text, " there");
    }
}
