use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::models::message::Message;
use crate::models::response::Response;
use crate::providers::base::{ChatOptions, Provider};

/// A mock provider that returns pre-configured responses for testing, and
/// records every conversation it was sent
#[derive(Default)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Response>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Response>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::default(),
        }
    }

    /// The conversations received so far, one per call
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, messages: &[Message], _options: &ChatOptions) -> Result<Response> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(anyhow!("mock provider has no more responses"))
        } else {
            Ok(responses.remove(0))
        }
    }
}
