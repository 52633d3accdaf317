use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use parley::agent::DEFAULT_MAX_ROUND_TRIPS;
use parley::providers::{
    anthropic::{ANTHROPIC_HOST, ANTHROPIC_MODEL},
    configs::{AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig},
    factory::ProviderType,
    openai::{OPENAI_HOST, OPENAI_MODEL},
};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    Anthropic {
        #[serde(default = "default_anthropic_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    #[allow(dead_code)]
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::Anthropic { .. } => ProviderType::Anthropic,
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
        }
    }

    /// Convert to the parley ProviderConfig. Without `PARLEY_PROVIDER__API_KEY`
    /// the vendor's own variable (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`) is used.
    pub fn into_config(self) -> Result<ProviderConfig, ConfigError> {
        match self {
            ProviderSettings::Anthropic {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => Ok(ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key: resolve_api_key(api_key, "ANTHROPIC_API_KEY")?,
                model,
                temperature,
                max_tokens,
            })),
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => Ok(ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key: resolve_api_key(api_key, "OPENAI_API_KEY")?,
                model,
                temperature,
                max_tokens,
            })),
        }
    }
}

fn resolve_api_key(api_key: Option<String>, vendor_var: &str) -> Result<String, ConfigError> {
    api_key
        .filter(|key| !key.is_empty())
        .or_else(|| env::var(vendor_var).ok().filter(|key| !key.is_empty()))
        .ok_or_else(|| ConfigError::MissingEnvVar {
            env_var: to_env_var("provider.api_key"),
        })
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_round_trips")]
    pub max_round_trips: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_round_trips: default_max_round_trips(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub agent: AgentSettings,
    pub provider: ProviderSettings,
}

impl Settings {
    #[allow(dead_code)]
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None, None)
    }

    /// Load settings from the environment, letting command line flags take
    /// precedence for the provider type and model
    pub fn load(
        provider: Option<ProviderType>,
        model: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("agent.max_round_trips", default_max_round_trips() as i64)?
            .set_default("provider.type", ProviderType::Anthropic.to_string())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("PARLEY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("provider.type", provider.map(|p| p.to_string()))?
            .set_override_option("provider.model", model)?
            .build()?;

        // Handle missing field errors specially
        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if let Some(field) = missing_field_path(&error_str) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

/// Extract the settings path from messages like "missing field `type` for
/// key `provider`"
fn missing_field_path(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    match rest
        .split_once("for key `")
        .and_then(|(_, key)| key.split_once('`'))
    {
        Some((key, _)) if !key.is_empty() => Some(format!("{}.{}", key, field)),
        _ => Some(field.to_string()),
    }
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_anthropic_model() -> String {
    ANTHROPIC_MODEL.to_string()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    OPENAI_MODEL.to_string()
}

fn default_max_round_trips() -> usize {
    DEFAULT_MAX_ROUND_TRIPS
}
