use std::env;

use thiserror::Error;

use crate::usage::DEFAULT_BASE_URL;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not defined")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Where the account store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), max_connections: 5 }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Reads `DATABASE_URL` and the optional `DATABASE_MAX_CONNECTIONS`,
    /// after loading a `.env` file if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let mut config = Self::new(url);

        if let Ok(value) = env::var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = value
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid { var: "DATABASE_MAX_CONNECTIONS", value })?;
        }

        Ok(config)
    }
}

/// Base URL of the usage API, `USAGE_API_BASE` or the public service.
pub fn usage_api_base() -> String {
    dotenvy::dotenv().ok();
    env::var("USAGE_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}
