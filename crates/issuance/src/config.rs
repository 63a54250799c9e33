//! Label API client configuration.

use std::time::Duration;

use thiserror::Error;

pub const LABEL_API_URL_ENV: &str = "SHIPALLOC_LABEL_API_URL";
pub const LABEL_API_KEY_ENV: &str = "SHIPALLOC_LABEL_API_KEY";
pub const LABEL_API_TIMEOUT_ENV: &str = "SHIPALLOC_LABEL_API_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Label API client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelApiConfig {
    /// Base URL; requests go to `<base_url>/labels`.
    pub base_url: String,
    /// Bearer token, if the API requires one.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for LabelApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl LabelApiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(LABEL_API_URL_ENV)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(LABEL_API_URL_ENV))?;

        let mut config = Self::default().with_base_url(base_url);

        if let Some(key) = lookup(LABEL_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            config = config.with_api_key(key.trim());
        }

        if let Some(raw) = lookup(LABEL_API_TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: LABEL_API_TIMEOUT_ENV,
                reason: format!("{e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: LABEL_API_TIMEOUT_ENV,
                    reason: "must be greater than 0".to_string(),
                });
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn labels_url(&self) -> String {
        format!("{}/labels", self.base_url.trim_end_matches('/'))
    }
}
