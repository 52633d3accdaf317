use anyhow::Result;
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::response::Response;
use crate::providers::base::{ChatOptions, Provider};
use crate::tools::files::FileTools;
use crate::tools::ToolExecutor;

pub const DEFAULT_MAX_ROUND_TRIPS: usize = 10;

/// Agent drives a provider through tool round trips until the model answers
/// without requesting a tool
pub struct Agent {
    provider: Box<dyn Provider>,
    executor: Arc<dyn ToolExecutor>,
    max_round_trips: usize,
}

impl Agent {
    /// Create a new Agent with the specified provider and the built-in file tools
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            executor: Arc::new(FileTools::new()),
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_max_round_trips(mut self, max_round_trips: usize) -> Self {
        self.max_round_trips = max_round_trips;
        self
    }

    /// Send the conversation and resolve any tool requests, returning the
    /// first response that requests no tool
    pub async fn reply(&self, messages: &[Message], options: &ChatOptions) -> Result<Response> {
        let (response, _) = self.reply_with_transcript(messages, options).await?;
        Ok(response)
    }

    /// Like [`Agent::reply`], also returning the conversation augmented with
    /// every assistant and tool turn produced along the way
    pub async fn reply_with_transcript(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<(Response, Vec<Message>)> {
        let mut messages = messages.to_vec();
        let mut round_trips = 0;

        loop {
            let response = self.provider.complete(&messages, options).await?;

            let requests: Vec<_> = response
                .content
                .iter()
                .filter_map(|block| block.tool_call().map(|call| (block.tool_request_id(), call)))
                .collect();

            if requests.is_empty() {
                tracing::info!(round_trips, "conversation turn complete");
                return Ok((response, messages));
            }

            if round_trips >= self.max_round_trips {
                return Err(ProviderError::RoundTripLimit(self.max_round_trips).into());
            }
            round_trips += 1;

            // Sequential so a write and a following read in one response see
            // each other
            let mut tool_turn = Message::tool();
            for (id, call) in requests {
                tracing::debug!(tool = %call.name, id = %id, "running tool");
                let result = self.executor.execute(call).await;
                tool_turn = tool_turn.with_tool_response(id, result);
            }

            messages.push(response.to_message());
            messages.push(tool_turn);
        }
    }
}
