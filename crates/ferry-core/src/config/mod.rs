//! Configuration types for ferry.
//!
//! Configuration can be loaded from a YAML or TOML file (`ferry.yaml`,
//! `ferry.toml`) or, when no file is given, entirely from the environment
//! variables the migration has always used (`DB_*`, `KEYCLOAK_*`).
//!
//! # Sections
//!
//! - **upstream**: source Postgres connection
//! - **provider**: identity provider base URL, realm and client credentials
//! - **batch**: pacing, progress and token refresh settings
//! - **audit**: where audit files are written
//! - **profiles**: named migration profiles (built-in: `users`, `customers`)

pub mod batch;
pub mod error;
pub mod profile;
pub mod provider;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use batch::BatchConfig;
pub use error::ConfigError;
pub use profile::{MigrationProfile, PasswordPolicy, SourceKind, UsernameStrategy};
pub use provider::{ProviderConfig, ProviderSettings};
pub use upstream::UpstreamConfig;

/// Complete ferry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Source Postgres connection.
    #[serde(default = "UpstreamConfig::from_env")]
    pub upstream: UpstreamConfig,

    /// Identity provider connection.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Batch pacing.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Audit output.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Profiles overriding or extending the built-in ones.
    #[serde(default)]
    pub profiles: BTreeMap<String, MigrationProfile>,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::from_env(),
            provider: ProviderConfig::default(),
            batch: BatchConfig::default(),
            audit: AuditConfig::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl FerryConfig {
    /// Load configuration from a file, or from the environment when `path` is `None`.
    ///
    /// The format is chosen by extension: `.toml` is TOML, anything else YAML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().map(|e| e == "toml").unwrap_or(false) {
            toml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        } else {
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }

    /// Resolve a profile by name: configured profiles first, then built-ins.
    pub fn profile(&self, name: &str) -> Result<MigrationProfile, ConfigError> {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(profile.clone());
        }
        MigrationProfile::builtin(name).ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Path of an audit file inside the configured audit directory.
    pub fn audit_path(&self, file_name: &str) -> PathBuf {
        self.audit.directory.join(file_name)
    }
}

/// Where audit files go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory for run-scoped audit files.
    #[serde(default = "default_audit_directory")]
    pub directory: PathBuf,

    /// File name used by role creation runs.
    #[serde(default = "default_role_log_file")]
    pub role_log_file: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            directory: default_audit_directory(),
            role_log_file: default_role_log_file(),
        }
    }
}

fn default_audit_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_role_log_file() -> String {
    "role_log.csv".to_string()
}
