use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::base::{ChatOptions, Provider};
use super::codec::{WireCodec, WireRequest};
use super::stream::StreamReassembler;
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::response::Response;

/// A provider that speaks HTTP and delegates the wire format to a codec
pub struct HttpProvider<C> {
    client: Client,
    codec: C,
}

impl<C: WireCodec> HttpProvider<C> {
    pub fn with_codec(codec: C) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, codec })
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    async fn post(&self, request: &WireRequest) -> Result<reqwest::Response> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(response)
    }
}

#[async_trait]
impl<C: WireCodec> Provider for HttpProvider<C> {
    async fn complete(&self, messages: &[Message], options: &ChatOptions) -> Result<Response> {
        let request = self.codec.encode(messages, options)?;

        tracing::debug!(
            provider = self.codec.name(),
            stream = request.stream,
            messages = messages.len(),
            tools = options.tools.len(),
            "sending request"
        );

        let response = self.post(&request).await?;

        if request.stream {
            StreamReassembler::new(&self.codec, options.sink.as_deref(), options.strict)
                .consume(response.bytes_stream())
                .await
        } else {
            let text = response.text().await?;
            let body: Value = serde_json::from_str(&text).map_err(|e| {
                ProviderError::InvalidResponse(format!("response body is not JSON: {}", e))
            })?;
            self.codec.decode_complete(&body)
        }
    }
}
