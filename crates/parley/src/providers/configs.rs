use anyhow::{anyhow, Result};
use std::env;
use std::fmt;

use super::anthropic::{ANTHROPIC_HOST, ANTHROPIC_MODEL};
use super::openai::{OPENAI_HOST, OPENAI_MODEL};

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Anthropic(AnthropicProviderConfig),
    OpenAi(OpenAiProviderConfig),
}

#[derive(Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

#[derive(Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl AnthropicProviderConfig {
    pub fn new<K: Into<String>>(api_key: K) -> Self {
        Self {
            host: ANTHROPIC_HOST.to_string(),
            api_key: api_key.into(),
            model: ANTHROPIC_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = get_env("ANTHROPIC_API_KEY", true, None)?
            .ok_or_else(|| anyhow!("Anthropic API key should be present"))?;
        let mut config = Self::new(api_key);
        if let Some(host) = get_env("ANTHROPIC_HOST", false, None)? {
            config.host = host;
        }
        if let Some(model) = get_env("ANTHROPIC_MODEL", false, None)? {
            config.model = model;
        }
        Ok(config)
    }
}

impl OpenAiProviderConfig {
    pub fn new<K: Into<String>>(api_key: K) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            model: OPENAI_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = get_env("OPENAI_API_KEY", true, None)?
            .ok_or_else(|| anyhow!("OpenAI API key should be present"))?;
        let mut config = Self::new(api_key);
        if let Some(host) = get_env("OPENAI_HOST", false, None)? {
            config.host = host;
        }
        if let Some(model) = get_env("OPENAI_MODEL", false, None)? {
            config.model = model;
        }
        Ok(config)
    }
}

// Keys stay out of logs
impl fmt::Debug for AnthropicProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicProviderConfig")
            .field("host", &self.host)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl fmt::Debug for OpenAiProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProviderConfig")
            .field("host", &self.host)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Helper function to get environment variables with error handling
fn get_env(key: &str, required: bool, default: Option<String>) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        Ok(_) | Err(env::VarError::NotPresent) if !required => Ok(default),
        Ok(_) | Err(env::VarError::NotPresent) => Err(anyhow!(
            "Environment variable '{}' is required but not set.",
            key
        )),
        Err(e) => Err(e.into()),
    }
}
