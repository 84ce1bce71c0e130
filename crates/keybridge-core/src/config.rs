/*
[INPUT]:  Deserialized configuration values (file, environment)
[OUTPUT]: Validated configuration records for sessions and the provider
[POS]:    Configuration layer - injected into component constructors
[UPDATE]: When adding configuration options or validation rules
*/

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{KeybridgeError, Result};

/// Fixed bearer-token validity window; configuration may shorten it, never extend it
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted code-request handle lifetime
pub const MAX_CODE_TTL_SECS: u64 = 60 * 60;

/// Longest accepted provider-session cache age
pub const MAX_PROVIDER_SESSION_AGE_SECS: u64 = 30 * 24 * 60 * 60;

const DEFAULT_PROVIDER_BASE_URL: &str = "http://127.0.0.1:8081";

/// Wallet session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> chrono::Duration {
        bounded_seconds(self.ttl_secs, SESSION_TTL_SECS)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("session ttl_secs", self.ttl_secs, SESSION_TTL_SECS)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

/// External provider credentials and call limits
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_id: i32,
    #[serde(default)]
    pub api_hash: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound for every provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// How long a code-request handle stays usable
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,
    /// Optional age limit for cached provider sessions; unset keeps them for the process lifetime
    #[serde(default)]
    pub session_max_age_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn new(api_id: i32, api_hash: impl Into<String>) -> Self {
        Self {
            api_id,
            api_hash: api_hash.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn code_ttl(&self) -> chrono::Duration {
        bounded_seconds(self.code_ttl_secs, MAX_CODE_TTL_SECS)
    }

    pub fn session_max_age(&self) -> Option<chrono::Duration> {
        self.session_max_age_secs
            .map(|secs| bounded_seconds(secs, MAX_PROVIDER_SESSION_AGE_SECS))
    }

    /// Startup check; a provider-backed component is never built from a config that fails here.
    pub fn validate(&self) -> Result<()> {
        if self.api_id <= 0 {
            return Err(KeybridgeError::InvalidCredentialsConfigured(
                "api_id must be a positive integer".to_string(),
            ));
        }
        if self.api_hash.trim().is_empty() {
            return Err(KeybridgeError::InvalidCredentialsConfigured(
                "api_hash must not be empty".to_string(),
            ));
        }
        Url::parse(&self.base_url)?;
        if self.timeout_secs == 0 {
            return Err(KeybridgeError::Config(
                "provider timeout must be greater than zero".to_string(),
            ));
        }
        check_range("provider code_ttl_secs", self.code_ttl_secs, MAX_CODE_TTL_SECS)?;
        if let Some(secs) = self.session_max_age_secs {
            check_range(
                "provider session_max_age_secs",
                secs,
                MAX_PROVIDER_SESSION_AGE_SECS,
            )?;
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_id: 0,
            api_hash: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            code_ttl_secs: default_code_ttl_secs(),
            session_max_age_secs: None,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("code_ttl_secs", &self.code_ttl_secs)
            .field("session_max_age_secs", &self.session_max_age_secs)
            .finish()
    }
}

/// Top-level configuration consumed by the core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

impl CoreConfig {
    /// Provider section, validated; missing or invalid credentials fail closed
    pub fn provider(&self) -> Result<&ProviderConfig> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            KeybridgeError::InvalidCredentialsConfigured(
                "provider section is missing".to_string(),
            )
        })?;
        provider.validate()?;
        Ok(provider)
    }
}

fn check_range(name: &str, secs: u64, max: u64) -> Result<()> {
    if secs == 0 || secs > max {
        return Err(KeybridgeError::Config(format!(
            "{name} must be between 1 and {max}, got {secs}"
        )));
    }
    Ok(())
}

/// Seconds clamped to `max`; every cap above fits a chrono duration
fn bounded_seconds(secs: u64, max: u64) -> chrono::Duration {
    let secs = i64::try_from(secs.min(max)).unwrap_or(i64::MAX);
    chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
}

fn default_session_ttl_secs() -> u64 {
    SESSION_TTL_SECS
}

fn default_base_url() -> String {
    DEFAULT_PROVIDER_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_code_ttl_secs() -> u64 {
    300
}
