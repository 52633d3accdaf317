//! Turns a provider's `text/event-stream` body into one [`Response`].
//!
//! Events are read in order and decoded by the provider's codec; each text
//! delta is applied to its block and relayed to the sink before the next event
//! is read. Blank lines and lines without a `data:` prefix (keep-alives, `event:`
//! names, comments) are skipped. `data: [DONE]` or the end of input completes
//! the stream; a payload that is not JSON or not UTF-8 fails the whole request.

use anyhow::Result;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};

use super::base::Usage;
use super::codec::{StreamEvent, WireCodec};
use crate::errors::ProviderError;
use crate::models::response::{BlockKind, ContentBlock, Response};
use crate::sink::DeltaSink;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Done,
}

pub struct StreamReassembler<'a> {
    codec: &'a dyn WireCodec,
    sink: Option<&'a dyn DeltaSink>,
    strict: bool,
    response: Response,
    pending_stop_reason: Option<String>,
    pending_stop_sequence: Option<String>,
    pending_usage: Usage,
    finalized: bool,
    started: bool,
}

impl<'a> StreamReassembler<'a> {
    pub fn new(codec: &'a dyn WireCodec, sink: Option<&'a dyn DeltaSink>, strict: bool) -> Self {
        Self {
            codec,
            sink,
            strict,
            response: Response::default(),
            pending_stop_reason: None,
            pending_stop_sequence: None,
            pending_usage: Usage::default(),
            finalized: false,
            started: false,
        }
    }

    fn ensure_started(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            for event in self.codec.stream_prelude() {
                self.apply(event)?;
            }
        }
        Ok(())
    }

    /// Process one raw line of the event stream
    pub fn push_line(&mut self, line: &str) -> Result<LineOutcome> {
        self.ensure_started()?;

        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(LineOutcome::Continue);
        }
        match line.strip_prefix(DATA_PREFIX) {
            Some(data) => self.push_data(data),
            None => Ok(LineOutcome::Continue),
        }
    }

    /// Process the payload of one `data:` field
    pub fn push_data(&mut self, data: &str) -> Result<LineOutcome> {
        self.ensure_started()?;

        let data = data.trim();
        if data.is_empty() {
            return Ok(LineOutcome::Continue);
        }
        if data == DONE_MARKER {
            return Ok(LineOutcome::Done);
        }

        for event in self.codec.decode_stream_event(data)? {
            self.apply(event)?;
        }
        Ok(LineOutcome::Continue)
    }

    pub fn apply(&mut self, event: StreamEvent) -> Result<()> {
        match event {
            StreamEvent::MessageStart { id, model, usage } => {
                if self.response.id.is_empty() {
                    self.response.id = id;
                }
                if self.response.model.is_none() {
                    self.response.model = model;
                }
                self.hold_usage(usage);
            }
            StreamEvent::BlockStart {
                index,
                kind,
                id,
                name,
            } => {
                if self.response.block(index).is_some() {
                    tracing::warn!(index, "block started twice, keeping the first");
                    return Ok(());
                }
                self.response.content.push(ContentBlock {
                    kind,
                    index,
                    text: String::new(),
                    id,
                    name,
                });
            }
            StreamEvent::BlockDelta { index, text } => {
                let Some(block) = self.response.content.iter_mut().find(|b| b.index == index)
                else {
                    if self.strict {
                        return Err(ProviderError::UnknownBlock { index }.into());
                    }
                    tracing::warn!(index, "dropping delta for a block that was never started");
                    return Ok(());
                };
                if text.is_empty() {
                    return Ok(());
                }
                block.text.push_str(&text);
                if block.kind == BlockKind::Text {
                    if let Some(sink) = self.sink {
                        sink.on_delta(&text);
                    }
                }
            }
            StreamEvent::MessageDelta {
                stop_reason,
                stop_sequence,
                usage,
            } => {
                self.hold_stop(stop_reason, stop_sequence);
                self.hold_usage(usage);
            }
            StreamEvent::MessageStop {
                stop_reason,
                stop_sequence,
                usage,
            } => {
                self.hold_stop(stop_reason, stop_sequence);
                self.hold_usage(usage);
                self.finalize();
            }
        }
        Ok(())
    }

    fn hold_stop(&mut self, stop_reason: Option<String>, stop_sequence: Option<String>) {
        if self.finalized {
            if stop_reason.is_some() || stop_sequence.is_some() {
                tracing::debug!("stop details already finalized, ignoring later report");
            }
            return;
        }
        if stop_reason.is_some() {
            self.pending_stop_reason = stop_reason;
        }
        if stop_sequence.is_some() {
            self.pending_stop_sequence = stop_sequence;
        }
    }

    fn hold_usage(&mut self, usage: Option<Usage>) {
        if let Some(usage) = usage {
            if self.finalized {
                tracing::debug!("usage already finalized, ignoring later report");
            } else {
                self.pending_usage.merge(&usage);
            }
        }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.response.stop_reason = self.pending_stop_reason.take();
        self.response.stop_sequence = self.pending_stop_sequence.take();
        self.response.usage = std::mem::take(&mut self.pending_usage);
        self.finalized = true;
    }

    /// Complete the stream, applying any stop details still pending
    pub fn finish(mut self) -> Result<Response> {
        self.ensure_started()?;
        self.finalize();
        Ok(self.response)
    }

    /// Read a `text/event-stream` body to completion
    pub async fn consume<S, B, E>(mut self, stream: S) -> Result<Response>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let events = stream.eventsource();
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(EventStreamError::Transport(err)) => return Err(err.into()),
                Err(EventStreamError::Utf8(err)) => {
                    return Err(ProviderError::InvalidEncoding(err.to_string()).into())
                }
                Err(err) => {
                    return Err(
                        ProviderError::InvalidResponse(format!("malformed event stream: {}", err))
                            .into(),
                    )
                }
            };
            if self.push_data(&event.data)? == LineOutcome::Done {
                break;
            }
        }
        self.finish()
    }
}

/// Reassemble an already-split sequence of lines
pub fn reassemble_lines<'a, I>(
    codec: &dyn WireCodec,
    lines: I,
    sink: Option<&dyn DeltaSink>,
    strict: bool,
) -> Result<Response>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut reassembler = StreamReassembler::new(codec, sink, strict);
    for line in lines {
        if reassembler.push_line(line)? == LineOutcome::Done {
            break;
        }
    }
    reassembler.finish()
}
