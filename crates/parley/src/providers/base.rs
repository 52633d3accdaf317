use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::models::message::Message;
use crate::models::response::Response;
use crate::models::tool::{Tool, ToolChoice};
use crate::sink::DeltaSink;
use crate::tools::files::file_tools;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        let total_tokens = total_tokens.or(match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => input.checked_add(output),
            _ => None,
        });
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none() && self.output_tokens.is_none() && self.total_tokens.is_none()
    }

    /// Fill in counts reported by a later event, keeping ones it does not mention
    pub fn merge(&mut self, other: &Usage) {
        let input = other.input_tokens.or(self.input_tokens);
        let output = other.output_tokens.or(self.output_tokens);
        *self = Usage::new(input, output, other.total_tokens);
    }
}

/// Per-call options. Immutable for the duration of a call; a continuation
/// reuses the same options with a longer conversation.
#[derive(Clone, Default)]
pub struct ChatOptions {
    pub system: String,
    pub max_tokens: Option<i32>,
    pub temperature: Option<f32>,
    pub tools: Vec<Tool>,
    pub tool_choice: Option<ToolChoice>,
    pub stream: bool,
    /// Receives every text delta in arrival order while streaming
    pub sink: Option<Arc<dyn DeltaSink>>,
    /// Treat a delta for an index without a prior block start as a fatal error
    pub strict: bool,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for conversations that may read and write local files:
    /// file tools enabled, automatic tool choice, non-streaming.
    pub fn file_assistant<S: Into<String>>(system: S) -> Self {
        Self {
            system: system.into(),
            max_tokens: Some(4096),
            temperature: Some(0.7),
            tools: file_tools(),
            tool_choice: Some(ToolChoice::Auto),
            stream: false,
            sink: None,
            strict: false,
        }
    }

    pub fn with_system<S: Into<String>>(mut self, system: S) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    /// Stream the reply, relaying each text delta to `sink`
    pub fn streaming(mut self, sink: Arc<dyn DeltaSink>) -> Self {
        self.stream = true;
        self.sink = Some(sink);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Tool requests must be fully materialized before they can be dispatched,
    /// so supplying tools forces non-streaming mode and an automatic tool
    /// choice when none was given.
    pub fn normalized(&self) -> ChatOptions {
        let mut options = self.clone();
        if !options.tools.is_empty() {
            options.stream = false;
            if options.tool_choice.is_none() {
                options.tool_choice = Some(ToolChoice::Auto);
            }
        }
        options
    }
}

impl fmt::Debug for ChatOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatOptions")
            .field("system", &self.system)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            )
            .field("tool_choice", &self.tool_choice)
            .field("stream", &self.stream)
            .field("sink", &self.sink.is_some())
            .field("strict", &self.strict)
            .finish()
    }
}

/// Base trait for AI providers (Anthropic, OpenAI)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one request/response cycle for the conversation so far
    async fn complete(&self, messages: &[Message], options: &ChatOptions) -> Result<Response>;
}
