use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use super::base::Usage;
use super::codec::{check_error, str_field, usage_field};
use crate::errors::ProviderError;
use crate::models::message::{Message, MessageContent};
use crate::models::response::{ContentBlock, Response};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolChoice};

lazy_static! {
    static ref INVALID_FUNCTION_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification.
/// Tool results are sent as `role: tool` messages whose content is the JSON
/// payload string, one per result, right after the assistant turn.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = Map::new();
        converted.insert("role".to_string(), json!(message.role));

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(t) => text.push_str(&t.text),
                MessageContent::ToolRequest(request) => {
                    tool_calls.push(json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": sanitize_function_name(&request.tool_call.name),
                            "arguments": request.tool_call.arguments.to_string(),
                        }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    output.push(json!({
                        "role": "tool",
                        "content": response.tool_result.payload().to_string(),
                        "tool_call_id": response.id
                    }));
                }
            }
        }

        if !text.is_empty() {
            converted.insert("content".to_string(), json!(text));
        }
        if !tool_calls.is_empty() {
            converted.insert("tool_calls".to_string(), json!(tool_calls));
        }

        if converted.contains_key("content") || converted.contains_key("tool_calls") {
            output.insert(0, Value::Object(converted));
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": sanitize_function_name(&tool.name),
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

pub fn tool_choice_to_openai_spec(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Any => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Tool(name) => json!({
            "type": "function",
            "function": {"name": sanitize_function_name(name)}
        }),
    }
}

pub fn get_openai_usage(usage: &Value) -> Option<Usage> {
    if !usage.is_object() {
        return None;
    }
    Some(Usage::new(
        usage_field(usage, "prompt_tokens"),
        usage_field(usage, "completion_tokens"),
        usage_field(usage, "total_tokens"),
    ))
}

/// Convert OpenAI's complete response to a Response. Only the first choice is
/// used; its text becomes block 0 and each tool call a following block.
pub fn openai_response_to_response(body: &Value) -> Result<Response> {
    check_error(body)?;

    let choice = body
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| ProviderError::InvalidResponse("no choices in OpenAI response".into()))?;
    let message = choice.get("message").unwrap_or(&Value::Null);

    let mut content = Vec::new();
    if let Some(text) = message.get("content").and_then(|t| t.as_str()) {
        content.push(ContentBlock::text(0, text));
    }

    if let Some(tool_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let index = content.len();
            let function = tool_call.get("function").unwrap_or(&Value::Null);
            let name = str_field(function, "name").unwrap_or_default();
            if !is_valid_function_name(&name) {
                tracing::warn!(name = %name, "model requested a tool with an invalid name");
            }
            content.push(ContentBlock::tool_request(
                index,
                str_field(tool_call, "id").unwrap_or_else(|| format!("call_{}", index)),
                name,
                str_field(function, "arguments").unwrap_or_default(),
            ));
        }
    }

    Ok(Response {
        id: str_field(body, "id").unwrap_or_default(),
        model: str_field(body, "model"),
        role: Role::Assistant,
        content,
        stop_reason: str_field(choice, "finish_reason"),
        stop_sequence: None,
        usage: body
            .get("usage")
            .and_then(get_openai_usage)
            .unwrap_or_default(),
    })
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_FUNCTION_CHARS.replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty() && !INVALID_FUNCTION_CHARS.is_match(name)
}
