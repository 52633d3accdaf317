use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings key such as `provider.api_key` to the environment variable
/// that sets it, `PARLEY_PROVIDER__API_KEY`
pub fn to_env_var(field_path: &str) -> String {
    let path = field_path
        .split('.')
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("__");
    format!("PARLEY_{}", path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider"), "PARLEY_PROVIDER");
        assert_eq!(to_env_var("provider.api_key"), "PARLEY_PROVIDER__API_KEY");
        assert_eq!(to_env_var("agent.max_round_trips"), "PARLEY_AGENT__MAX_ROUND_TRIPS");
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar {
            env_var: "PARLEY_PROVIDER__API_KEY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: PARLEY_PROVIDER__API_KEY"
        );
    }
}
