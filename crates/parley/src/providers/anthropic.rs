use anyhow::{anyhow, Result};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use super::base::{ChatOptions, Usage};
use super::codec::{check_error, parse_event, str_field, usage_field, StreamEvent, WireCodec, WireRequest};
use super::configs::AnthropicProviderConfig;
use super::http::HttpProvider;
use crate::errors::ProviderError;
use crate::models::message::{Message, MessageContent};
use crate::models::response::{BlockKind, ContentBlock, Response};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolChoice};

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: i32 = 1024;

pub type AnthropicProvider = HttpProvider<AnthropicCodec>;

impl HttpProvider<AnthropicCodec> {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        HttpProvider::with_codec(AnthropicCodec::new(config))
    }
}

/// Anthropic messages API: typed content-block lifecycle events
pub struct AnthropicCodec {
    config: AnthropicProviderConfig,
}

impl AnthropicCodec {
    pub fn new(config: AnthropicProviderConfig) -> Self {
        Self { config }
    }

    fn get_usage(usage: &Value) -> Option<Usage> {
        if !usage.is_object() {
            return None;
        }
        Some(Usage::new(
            usage_field(usage, "input_tokens"),
            usage_field(usage, "output_tokens"),
            None,
        ))
    }

    fn tool_choice_spec(choice: &ToolChoice) -> Value {
        match choice {
            ToolChoice::Auto => json!({"type": "auto"}),
            ToolChoice::Any => json!({"type": "any"}),
            ToolChoice::None => json!({"type": "none"}),
            ToolChoice::Tool(name) => json!({"type": "tool", "name": name}),
        }
    }

    fn decode_block(index: usize, block: &Value) -> Option<ContentBlock> {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => Some(ContentBlock::text(
                index,
                block.get("text").and_then(|t| t.as_str()).unwrap_or_default(),
            )),
            Some("tool_use") => {
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                Some(ContentBlock::tool_request(
                    index,
                    str_field(block, "id").unwrap_or_else(|| format!("call_{}", index)),
                    str_field(block, "name").unwrap_or_default(),
                    input.to_string(),
                ))
            }
            _ => None,
        }
    }
}

/// Convert the conversation into Anthropic's message list. System turns are
/// folded into the top-level system prompt; tool turns become user messages
/// carrying `tool_result` blocks.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> (Vec<String>, Vec<Value>) {
    let mut system = Vec::new();
    let mut spec = Vec::new();

    for message in messages {
        if message.role == Role::System {
            let text = message.text();
            if !text.is_empty() {
                system.push(text);
            }
            continue;
        }

        let role = match message.role {
            Role::Assistant => "assistant",
            _ => "user",
        };

        let text_only = message
            .content
            .iter()
            .all(|c| matches!(c, MessageContent::Text(_)));

        let content = if text_only {
            let text = message.text();
            if text.is_empty() {
                continue;
            }
            json!(text)
        } else {
            let mut blocks = Vec::new();
            for content in &message.content {
                match content {
                    MessageContent::Text(text) => {
                        if !text.text.is_empty() {
                            blocks.push(json!({"type": "text", "text": text.text}));
                        }
                    }
                    MessageContent::ToolRequest(request) => {
                        let input = if request.tool_call.arguments.is_object() {
                            request.tool_call.arguments.clone()
                        } else {
                            json!({})
                        };
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": request.id,
                            "name": request.tool_call.name,
                            "input": input,
                        }));
                    }
                    MessageContent::ToolResponse(response) => {
                        blocks.push(json!({
                            "type": "tool_result",
                            "tool_use_id": response.id,
                            "content": response.tool_result.payload().to_string(),
                            "is_error": !response.tool_result.success,
                        }));
                    }
                }
            }
            json!(blocks)
        };

        spec.push(json!({"role": role, "content": content}));
    }

    (system, spec)
}

pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }
        result.push(json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        }));
    }

    Ok(result)
}

impl WireCodec for AnthropicCodec {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn encode(&self, messages: &[Message], options: &ChatOptions) -> Result<WireRequest> {
        let options = options.normalized();
        let (system_turns, anthropic_messages) = messages_to_anthropic_spec(messages);

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert("messages".to_string(), json!(anthropic_messages));
        payload.insert(
            "max_tokens".to_string(),
            json!(options
                .max_tokens
                .or(self.config.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS)),
        );

        let system: Vec<&str> = std::iter::once(options.system.as_str())
            .chain(system_turns.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
            .collect();
        if !system.is_empty() {
            payload.insert("system".to_string(), json!(system.join("\n\n")));
        }
        if let Some(temp) = options.temperature.or(self.config.temperature) {
            payload.insert("temperature".to_string(), json!(temp));
        }
        if options.stream {
            payload.insert("stream".to_string(), json!(true));
        }
        if !options.tools.is_empty() {
            payload.insert(
                "tools".to_string(),
                json!(tools_to_anthropic_spec(&options.tools)?),
            );
        }
        if let Some(choice) = &options.tool_choice {
            payload.insert("tool_choice".to_string(), Self::tool_choice_spec(choice));
        }

        Ok(WireRequest {
            url: format!("{}/v1/messages", self.config.host.trim_end_matches('/')),
            headers: vec![
                ("x-api-key".to_string(), self.config.api_key.clone()),
                ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
            ],
            body: Value::Object(payload),
            stream: options.stream,
        })
    }

    fn decode_complete(&self, body: &Value) -> Result<Response> {
        check_error(body)?;

        let blocks = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing content array in Anthropic response".into())
            })?;

        let content = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| Self::decode_block(index, block))
            .collect();

        Ok(Response {
            id: str_field(body, "id").unwrap_or_default(),
            model: str_field(body, "model"),
            role: Role::Assistant,
            content,
            stop_reason: str_field(body, "stop_reason"),
            stop_sequence: str_field(body, "stop_sequence"),
            usage: body
                .get("usage")
                .and_then(Self::get_usage)
                .unwrap_or_default(),
        })
    }

    fn decode_stream_event(&self, data: &str) -> Result<Vec<StreamEvent>> {
        let event = parse_event(data)?;
        let kind = event.get("type").and_then(|t| t.as_str());
        let index = event
            .get("index")
            .and_then(|i| i.as_u64())
            .and_then(|i| usize::try_from(i).ok());

        // a block event without an index cannot be attributed to any block
        let index = match (kind, index) {
            (Some("content_block_start" | "content_block_delta"), None) => {
                tracing::warn!(?kind, "dropping block event without an index");
                return Ok(vec![]);
            }
            (_, index) => index.unwrap_or_default(),
        };

        let decoded = match kind {
            Some("message_start") => {
                let message = event.get("message").unwrap_or(&event);
                vec![StreamEvent::MessageStart {
                    id: str_field(message, "id")
                        .or_else(|| str_field(&event, "id"))
                        .unwrap_or_default(),
                    model: str_field(message, "model"),
                    usage: message.get("usage").and_then(Self::get_usage),
                }]
            }
            Some("content_block_start") => {
                let block = event.get("content_block").unwrap_or(&Value::Null);
                match block.get("type").and_then(|t| t.as_str()) {
                    Some("text") => vec![StreamEvent::BlockStart {
                        index,
                        kind: BlockKind::Text,
                        id: None,
                        name: None,
                    }],
                    Some("tool_use") => vec![StreamEvent::BlockStart {
                        index,
                        kind: BlockKind::ToolRequest,
                        id: str_field(block, "id"),
                        name: str_field(block, "name"),
                    }],
                    other => {
                        tracing::trace!(?other, index, "ignoring content block kind");
                        vec![]
                    }
                }
            }
            Some("content_block_delta") => {
                let delta = event.get("delta").unwrap_or(&Value::Null);
                let text = match delta.get("type").and_then(|t| t.as_str()) {
                    Some("input_json_delta") => str_field(delta, "partial_json"),
                    Some("text_delta") | None => str_field(delta, "text"),
                    Some(_) => None,
                };
                text.map(|text| StreamEvent::BlockDelta { index, text })
                    .into_iter()
                    .collect()
            }
            Some("message_delta") => {
                let delta = event.get("delta").unwrap_or(&Value::Null);
                vec![StreamEvent::MessageDelta {
                    stop_reason: str_field(delta, "stop_reason"),
                    stop_sequence: str_field(delta, "stop_sequence"),
                    usage: event.get("usage").and_then(Self::get_usage),
                }]
            }
            Some("message_stop") => vec![StreamEvent::MessageStop {
                stop_reason: str_field(&event, "stop_reason"),
                stop_sequence: str_field(&event, "stop_sequence"),
                usage: event.get("usage").and_then(Self::get_usage),
            }],
            Some("error") => {
                let error = event.get("error").unwrap_or(&event);
                return Err(ProviderError::from_error_object(error).into());
            }
            other => {
                tracing::trace!(?other, "ignoring stream event");
                vec![]
            }
        };

        Ok(decoded)
    }
}
