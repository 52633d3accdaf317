//! These models represent the objects passed around by the chat client
//!
//! There are several different related formats we need to interact with:
//! - conversation turns handed to us by the caller, and the reply we hand back
//! - anthropic messages/tools, sent to the LLM, and its typed lifecycle stream events
//! - openai messages/tools, sent to the LLM, and its flat delta stream chunks
//! - tool calls dispatched to the local tool executor
//!
//! We always immediately convert those wire formats into the internal structs
//! using the codecs in `providers`, so nothing downstream branches on the vendor.
pub mod message;
pub mod response;
pub mod role;
pub mod tool;
