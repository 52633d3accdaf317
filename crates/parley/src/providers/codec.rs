use anyhow::Result;
use serde_json::Value;
use std::fmt;

use super::base::{ChatOptions, Usage};
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::response::{BlockKind, Response};

/// Provider-neutral stream events. Each provider's stream format is decoded
/// into these so reassembly never needs to know which vendor it talks to.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Assigns the response id; only the first one is kept
    MessageStart {
        id: String,
        model: Option<String>,
        usage: Option<Usage>,
    },
    /// Declares a new content block at `index`
    BlockStart {
        index: usize,
        kind: BlockKind,
        id: Option<String>,
        name: Option<String>,
    },
    /// Appends text (or raw tool input JSON) to the block at `index`
    BlockDelta { index: usize, text: String },
    /// Stop details and usage reported before the stream ends
    MessageDelta {
        stop_reason: Option<String>,
        stop_sequence: Option<String>,
        usage: Option<Usage>,
    },
    /// Finalizes stop reason, stop sequence and usage
    MessageStop {
        stop_reason: Option<String>,
        stop_sequence: Option<String>,
        usage: Option<Usage>,
    },
}

/// A fully built HTTP request for a provider
#[derive(Clone)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    /// Whether the response arrives as an event stream
    pub stream: bool,
}

const SECRET_HEADERS: [&str; 2] = ["x-api-key", "authorization"];

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if SECRET_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
                    (key.as_str(), "[redacted]")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("WireRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .field("stream", &self.stream)
            .finish()
    }
}

/// The capabilities every provider offers: build a request, decode a complete
/// response body, and decode one stream event.
pub trait WireCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Build the request for this conversation. Options are normalized first,
    /// and the credential is embedded as a header.
    fn encode(&self, messages: &[Message], options: &ChatOptions) -> Result<WireRequest>;

    fn decode_complete(&self, body: &Value) -> Result<Response>;

    /// Decode the payload of one `data:` line. An empty vec means the event
    /// carries nothing we track.
    fn decode_stream_event(&self, data: &str) -> Result<Vec<StreamEvent>>;

    /// Events implied at the start of every stream, for formats without an
    /// explicit block lifecycle
    fn stream_prelude(&self) -> Vec<StreamEvent> {
        Vec::new()
    }
}

/// Parse one stream payload, classifying failures as framing errors
pub fn parse_event(data: &str) -> Result<Value, ProviderError> {
    serde_json::from_str(data).map_err(|source| ProviderError::Framing {
        line: data.to_string(),
        source,
    })
}

/// Surface an `error` object embedded in a response body
pub fn check_error(body: &Value) -> Result<(), ProviderError> {
    match body.get("error") {
        Some(error) if !error.is_null() => Err(ProviderError::from_error_object(error)),
        _ => Ok(()),
    }
}

/// A token count, or `None` when it is absent or does not fit in an `i32`
pub(crate) fn usage_field(usage: &Value, key: &str) -> Option<i32> {
    usage
        .get(key)
        .and_then(|v| v.as_i64())
        .and_then(|v| i32::try_from(v).ok())
        .filter(|v| *v >= 0)
}

pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_credentials() {
        let request = WireRequest {
            url: "https://api.anthropic.com/v1/messages".to_string(),
            headers: vec![
                ("x-api-key".to_string(), "sk-secret".to_string()),
                ("Authorization".to_string(), "Bearer sk-secret".to_string()),
                ("anthropic-version".to_string(), "2023-06-01".to_string()),
            ],
            body: json!({"model": "m"}),
            stream: false,
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("2023-06-01"));
        assert_eq!(request.header("X-API-KEY"), Some("sk-secret"));
    }

    #[test]
    fn test_parse_event_framing_error() {
        let err = parse_event("{not json").unwrap_err();
        assert!(matches!(err, ProviderError::Framing { ref line, .. } if line == "{not json"));
    }

    #[test]
    fn test_check_error() {
        assert!(check_error(&json!({"id": "x", "error": null})).is_ok());
        let err = check_error(&json!({"error": {"type": "invalid_request_error", "message": "bad"}}))
            .unwrap_err();
        assert_eq!(err.to_string(), "API error: invalid_request_error - bad");
    }

    #[test]
    fn test_usage_field_rejects_out_of_range_counts() {
        let usage = json!({"input_tokens": 3000000000u64, "output_tokens": 12, "cache": -4});
        assert_eq!(usage_field(&usage, "input_tokens"), None);
        assert_eq!(usage_field(&usage, "output_tokens"), Some(12));
        assert_eq!(usage_field(&usage, "cache"), None);
        assert_eq!(usage_field(&usage, "missing"), None);
    }
}
