//! Identity provider configuration.
//!
//! Every value can be set inline or through an environment variable; the
//! variable wins when it is set. The variable names default to the ones the
//! migration has always used (`KEYCLOAK_URL`, `KEYCLOAK_REALM`,
//! `KEYCLOAK_CLIENT_ID`, `KEYCLOAK_CLIENT_SECRET`).

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_base_url_env")]
    pub base_url_env: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default = "default_realm_env")]
    pub realm_env: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_url_env: default_base_url_env(),
            realm: None,
            realm_env: default_realm_env(),
            client_id: None,
            client_id_env: default_client_id_env(),
            client_secret: None,
            client_secret_env: default_client_secret_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Fully resolved provider settings.
#[derive(Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve every value, failing on the first one that is missing.
    pub fn resolve(&self) -> Result<ProviderSettings, ConfigError> {
        let base_url = pick(&self.base_url_env, &self.base_url, "provider.base_url")?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "provider.base_url",
                message: format!("expected an http(s) URL, got '{}'", base_url),
            });
        }

        Ok(ProviderSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            realm: pick(&self.realm_env, &self.realm, "provider.realm")?,
            client_id: pick(&self.client_id_env, &self.client_id, "provider.client_id")?,
            client_secret: pick(
                &self.client_secret_env,
                &self.client_secret,
                "provider.client_secret",
            )?,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

fn pick(env: &str, inline: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
    if let Ok(value) = std::env::var(env)
        && !value.trim().is_empty()
    {
        return Ok(value);
    }
    inline
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing {
            field,
            env: env.to_string(),
        })
}

fn default_base_url_env() -> String {
    "KEYCLOAK_URL".to_string()
}

fn default_realm_env() -> String {
    "KEYCLOAK_REALM".to_string()
}

fn default_client_id_env() -> String {
    "KEYCLOAK_CLIENT_ID".to_string()
}

fn default_client_secret_env() -> String {
    "KEYCLOAK_CLIENT_SECRET".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
