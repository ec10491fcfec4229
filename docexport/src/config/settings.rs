//! Process settings: API access, poll policy and logging.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use super::policy::PollPolicy;
use crate::errors::ConfigError;

/// Access to the remote document API.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every API request.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://coda.io/apis/v1".to_string()
}

fn default_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("docexport/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            request_timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Creates an API configuration with defaults and the given token.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("CODA_API_KEY".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::invalid("base_url", "must be an http(s) URL"));
        }
        if !self.request_timeout_seconds.is_finite() || self.request_timeout_seconds <= 0.0 {
            return Err(ConfigError::invalid(
                "request_timeout_seconds",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// All settings for one process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Remote API access.
    #[serde(default)]
    pub api: ApiConfig,
    /// Export poll policy.
    #[serde(default)]
    pub poll: PollPolicy,
    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

impl Settings {
    /// Loads settings from the environment, reading a `.env` file first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        settings.api.api_key = lookup("CODA_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .ok_or_else(|| ConfigError::Missing("CODA_API_KEY".to_string()))?;
        if let Some(base_url) = lookup("CODA_BASE_URL") {
            settings.api.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = parse(&lookup, "CODA_REQUEST_TIMEOUT_SECS")? {
            settings.api.request_timeout_seconds = timeout;
        }

        if let Some(v) = parse(&lookup, "EXPORT_POLL_MAX_ATTEMPTS")? {
            settings.poll.max_attempts = v;
        }
        if let Some(v) = parse(&lookup, "EXPORT_POLL_INITIAL_DELAY_MS")? {
            settings.poll.initial_delay_ms = v;
        }
        if let Some(v) = parse(&lookup, "EXPORT_POLL_BACKOFF_MULTIPLIER")? {
            settings.poll.backoff_multiplier = v;
        }
        if let Some(v) = parse(&lookup, "EXPORT_POLL_MAX_DELAY_MS")? {
            settings.poll.max_delay_ms = v;
        }
        if let Some(v) = parse(&lookup, "EXPORT_POLL_TIMEOUT_MS")? {
            settings.poll.overall_timeout_ms = v;
        }
        if let Some(v) = parse(&lookup, "EXPORT_POLL_JITTER")? {
            settings.poll.jitter = v;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            settings.log.level = level;
        }
        if let Some(format) = parse(&lookup, "LOG_FORMAT")? {
            settings.log.format = format;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.poll.validate()
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(key, e.to_string()))
        })
        .transpose()
}
