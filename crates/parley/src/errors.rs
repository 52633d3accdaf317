use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while dispatching a tool call. These are conversation data:
/// they are reported back to the model rather than aborting the request.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures of a single request/response cycle against a provider.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API request failed with status code {status}: {body}")]
    Status { status: u16, body: String },

    #[error("error parsing stream event {line:?}: {source}")]
    Framing {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stream body is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("API error: {kind} - {message}")]
    Api { kind: String, message: String },

    #[error("content block delta for index {index} arrived before its block start")]
    UnknownBlock { index: usize },

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("tool round trip limit of {0} exceeded")]
    RoundTripLimit(usize),
}

impl ProviderError {
    /// Build an `Api` error from a provider error object such as
    /// `{"type": "overloaded_error", "message": "Overloaded"}`.
    pub fn from_error_object(error: &serde_json::Value) -> Self {
        let kind = error
            .get("type")
            .or_else(|| error.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown_error")
            .to_string();
        let message = error
            .get("message")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        ProviderError::Api { kind, message }
    }
}
