//! Runtime configuration.

use crate::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};

/// Default identity provider API URL (can be overridden at compile time via
/// PROVIDER_API_URL env var).
pub const DEFAULT_PROVIDER_URL: &str = match option_env!("PROVIDER_API_URL") {
    Some(url) => url,
    None => "https://auth.driftline.dev/v1",
};

/// Default provider public token (can be overridden at compile time via
/// PROVIDER_PUBLIC_TOKEN env var).
pub const DEFAULT_PROVIDER_PUBLIC_TOKEN: &str = match option_env!("PROVIDER_PUBLIC_TOKEN") {
    Some(token) => token,
    None => "public-token-dev",
};

/// Default database API URL (can be overridden at compile time via
/// DATABASE_API_URL env var).
pub const DEFAULT_DATABASE_URL: &str = match option_env!("DATABASE_API_URL") {
    Some(url) => url,
    None => "https://db.driftline.dev",
};

/// Default provider session duration in minutes (8 hours).
pub const DEFAULT_SESSION_DURATION_MINUTES: u32 = 480;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime configuration for the bridge and channel registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Identity provider API base URL.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
    /// Provider public (publishable) token.
    #[serde(default = "default_provider_public_token")]
    pub provider_public_token: String,
    /// Database project API URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Database service-role key. Never shipped with defaults; must come
    /// from the environment.
    #[serde(default)]
    pub database_service_key: String,
    /// Provider session duration requested on authenticate.
    #[serde(default = "default_session_duration")]
    pub session_duration_minutes: u32,
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_provider_public_token() -> String {
    DEFAULT_PROVIDER_PUBLIC_TOKEN.to_string()
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_session_duration() -> u32 {
    DEFAULT_SESSION_DURATION_MINUTES
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            provider_public_token: DEFAULT_PROVIDER_PUBLIC_TOKEN.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_service_key: String::new(),
            session_duration_minutes: DEFAULT_SESSION_DURATION_MINUTES,
        }
    }
}

impl BridgeConfig {
    /// Create a new config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Override fields from `DRIFTLINE_*` environment variables.
    pub fn load_from_env(&mut self) {
        if let Some(level) = non_empty_env("DRIFTLINE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = non_empty_env("DRIFTLINE_PROVIDER_URL") {
            self.provider_url = url;
        }
        if let Some(token) = non_empty_env("DRIFTLINE_PROVIDER_PUBLIC_TOKEN") {
            self.provider_public_token = token;
        }
        if let Some(url) = non_empty_env("DRIFTLINE_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(key) = non_empty_env("DRIFTLINE_DATABASE_SERVICE_KEY") {
            self.database_service_key = key;
        }
        if let Some(minutes) = non_empty_env("DRIFTLINE_SESSION_DURATION_MINUTES")
            .and_then(|v| v.parse().ok())
        {
            self.session_duration_minutes = minutes;
        }
    }

    /// Check that the config is usable for server-side reconciliation.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.database_service_key.trim().is_empty() {
            return Err(RuntimeError::Config(
                "database service key is not set".to_string(),
            ));
        }
        if self.session_duration_minutes == 0 {
            return Err(RuntimeError::Config(
                "session duration must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
