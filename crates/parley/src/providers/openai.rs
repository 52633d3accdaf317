use anyhow::Result;
use serde_json::{json, Map, Value};

use super::base::ChatOptions;
use super::codec::{check_error, parse_event, str_field, StreamEvent, WireCodec, WireRequest};
use super::configs::OpenAiProviderConfig;
use super::http::HttpProvider;
use super::utils::{
    get_openai_usage, messages_to_openai_spec, openai_response_to_response,
    tool_choice_to_openai_spec, tools_to_openai_spec,
};
use crate::models::message::Message;
use crate::models::response::{BlockKind, Response};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

pub type OpenAiProvider = HttpProvider<OpenAiCodec>;

impl HttpProvider<OpenAiCodec> {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        HttpProvider::with_codec(OpenAiCodec::new(config))
    }
}

/// OpenAI chat completions: flat deltas, one implicit text block, `[DONE]`
/// terminator
pub struct OpenAiCodec {
    config: OpenAiProviderConfig,
}

impl OpenAiCodec {
    pub fn new(config: OpenAiProviderConfig) -> Self {
        Self { config }
    }
}

impl WireCodec for OpenAiCodec {
    fn name(&self) -> &str {
        "openai"
    }

    fn encode(&self, messages: &[Message], options: &ChatOptions) -> Result<WireRequest> {
        let options = options.normalized();

        // system message first
        let mut messages_array = Vec::new();
        if !options.system.is_empty() {
            messages_array.push(json!({"role": "system", "content": options.system}));
        }
        messages_array.extend(messages_to_openai_spec(messages));

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert("messages".to_string(), json!(messages_array));

        if !options.tools.is_empty() {
            payload.insert("tools".to_string(), json!(tools_to_openai_spec(&options.tools)?));
        }
        if let Some(choice) = &options.tool_choice {
            payload.insert("tool_choice".to_string(), tool_choice_to_openai_spec(choice));
        }
        if let Some(temp) = options.temperature.or(self.config.temperature) {
            payload.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = options.max_tokens.or(self.config.max_tokens) {
            payload.insert("max_tokens".to_string(), json!(tokens));
        }
        if options.stream {
            payload.insert("stream".to_string(), json!(true));
            payload.insert("stream_options".to_string(), json!({"include_usage": true}));
        }

        Ok(WireRequest {
            url: format!(
                "{}/v1/chat/completions",
                self.config.host.trim_end_matches('/')
            ),
            headers: vec![(
                "Authorization".to_string(),
                format!("Bearer {}", self.config.api_key),
            )],
            body: Value::Object(payload),
            stream: options.stream,
        })
    }

    fn decode_complete(&self, body: &Value) -> Result<Response> {
        openai_response_to_response(body)
    }

    fn decode_stream_event(&self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk = parse_event(data)?;
        check_error(&chunk)?;

        let mut events = Vec::new();
        if let Some(id) = str_field(&chunk, "id") {
            events.push(StreamEvent::MessageStart {
                id,
                model: str_field(&chunk, "model"),
                usage: None,
            });
        }

        let choice = chunk.get("choices").and_then(|c| c.get(0));
        if let Some(delta) = choice.and_then(|c| c.get("delta")) {
            if let Some(text) = delta.get("content").and_then(|t| t.as_str()) {
                if !text.is_empty() {
                    events.push(StreamEvent::BlockDelta {
                        index: 0,
                        text: text.to_string(),
                    });
                }
            }

            // tool calls live after the implicit text block
            for tool_call in delta
                .get("tool_calls")
                .and_then(|t| t.as_array())
                .into_iter()
                .flatten()
            {
                let index = 1 + tool_call
                    .get("index")
                    .and_then(|i| i.as_u64())
                    .unwrap_or_default() as usize;
                let function = tool_call.get("function").unwrap_or(&Value::Null);
                if let Some(id) = str_field(tool_call, "id") {
                    events.push(StreamEvent::BlockStart {
                        index,
                        kind: BlockKind::ToolRequest,
                        id: Some(id),
                        name: str_field(function, "name"),
                    });
                }
                if let Some(arguments) = str_field(function, "arguments") {
                    if !arguments.is_empty() {
                        events.push(StreamEvent::BlockDelta {
                            index,
                            text: arguments,
                        });
                    }
                }
            }
        }

        let stop_reason = choice.and_then(|c| str_field(c, "finish_reason"));
        let usage = chunk.get("usage").and_then(get_openai_usage);
        if stop_reason.is_some() || usage.is_some() {
            events.push(StreamEvent::MessageDelta {
                stop_reason,
                stop_sequence: None,
                usage,
            });
        }

        Ok(events)
    }

    fn stream_prelude(&self) -> Vec<StreamEvent> {
        vec![StreamEvent::BlockStart {
            index: 0,
            kind: BlockKind::Text,
            id: None,
            name: None,
        }]
    }
}
