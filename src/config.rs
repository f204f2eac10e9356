use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub fpma_api_url: String,
    /// Shared secret expected in the Authorization header of the
    /// recompute and catalog-sync triggers.
    pub recompute_token: String,
    /// Whether a signal run refreshes archive prices before computing.
    pub fpma_fetch_enabled: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let fpma_api_url = env_map
            .get("FPMA_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("FPMA_API_URL".to_string()))?;

        let recompute_token = env_map
            .get("RECOMPUTE_TOKEN")
            .cloned()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("RECOMPUTE_TOKEN".to_string()))?;

        let fpma_fetch_enabled = match env_map
            .get("FPMA_FETCH_ENABLED")
            .map(|s| s.as_str())
            .unwrap_or("true")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "FPMA_FETCH_ENABLED".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            fpma_api_url,
            recompute_token,
            fpma_fetch_enabled,
        })
    }
}
