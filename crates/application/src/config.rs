//! Handler configuration

use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the base URL.
pub const ENV_BASE_URL: &str = "APITRIAL_BASE_URL";
/// Environment variable holding the client timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "APITRIAL_TIMEOUT_MS";
/// Environment variable overriding the User-Agent header.
pub const ENV_USER_AGENT: &str = "APITRIAL_USER_AGENT";

/// Errors raised while loading a [`HandlerConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Settings of one handler. Built once and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HandlerConfig {
    /// Prefix of every request URL.
    pub base_url: String,
    /// Client-level timeout. The runner adds none of its own.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// User-Agent sent unless a test case overrides it.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// User-Agent sent when none is configured: `apitrial/<version>`.
#[must_use]
pub fn default_user_agent() -> String {
    format!("apitrial/{}", env!("CARGO_PKG_VERSION"))
}

impl HandlerConfig {
    /// Creates a configuration with no timeout and the default User-Agent.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: None,
            user_agent: default_user_agent(),
        }
    }

    /// Sets the client timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the User-Agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Loads the configuration from `APITRIAL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is unset or the timeout is not a
    /// number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let timeout_ms = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: ENV_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            config.timeout_ms = Some(timeout_ms);
        }

        if let Some(user_agent) = lookup(ENV_USER_AGENT) {
            config.user_agent = user_agent;
        }

        Ok(config)
    }
}
