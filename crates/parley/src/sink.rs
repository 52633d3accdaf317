//! Destinations for partial output while a reply is being streamed.
//!
//! A sink is called inline from the stream read loop, once per text delta, in
//! the order the provider framed them. It must return quickly and must not hold
//! on to the `&str` it is handed; copy it if it needs to outlive the call.

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub trait DeltaSink: Send + Sync {
    fn on_delta(&self, delta: &str);
}

impl<F> DeltaSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_delta(&self, delta: &str) {
        self(delta)
    }
}

/// Format one delta as a Server-Sent Events frame. The text is JSON encoded so
/// embedded newlines cannot break the framing.
pub fn format_sse_frame(delta: &str) -> String {
    let encoded = serde_json::to_string(delta).unwrap_or_else(|_| String::from("\"\""));
    format!("data: {}\n\n", encoded)
}

/// Relays deltas as SSE frames over an unbounded channel, so the read loop is
/// never blocked by a slow HTTP client. The receiving half is a `Stream` that
/// can be handed to a response body.
#[derive(Clone)]
pub struct SseSink {
    tx: mpsc::UnboundedSender<String>,
}

impl SseSink {
    pub fn channel() -> (Self, UnboundedReceiverStream<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UnboundedReceiverStream::new(rx))
    }

    /// Frame sent after the final delta, mirroring the provider convention
    pub fn finish(&self) {
        let _ = self.tx.send("data: [DONE]\n\n".to_string());
    }
}

impl DeltaSink for SseSink {
    fn on_delta(&self, delta: &str) {
        if self.tx.send(format_sse_frame(delta)).is_err() {
            tracing::debug!("sse receiver dropped, discarding delta");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = move |delta: &str| captured.lock().unwrap().push(delta.to_string());

        sink.on_delta("Hi");
        sink.on_delta(" there");
        assert_eq!(*seen.lock().unwrap(), vec!["Hi", " there"]);
    }

    #[test]
    fn test_sse_frame_escapes_newlines() {
        assert_eq!(format_sse_frame("a\nb"), "data: \"a\\nb\"\n\n");
    }

    #[tokio::test]
    async fn test_sse_sink_preserves_order() {
        let (sink, stream) = SseSink::channel();
        sink.on_delta("Hi");
        sink.on_delta(" there");
        sink.finish();
        drop(sink);

        let frames: Vec<String> = stream.collect().await;
        assert_eq!(
            frames,
            vec!["data: \"Hi\"\n\n", "data: \" there\"\n\n", "data: [DONE]\n\n"]
        );
    }

    #[test]
    fn test_sse_sink_survives_dropped_receiver() {
        let (sink, stream) = SseSink::channel();
        drop(stream);
        sink.on_delta("nobody listening");
    }
}
