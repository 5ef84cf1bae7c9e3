//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML/TOML for the expected structure.
    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A required value is neither configured nor present in the environment.
    #[error("missing configuration value: {field} (set it in the config file or via ${env})")]
    Missing { field: &'static str, env: String },

    /// A value is present but unusable.
    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: &'static str, message: String },

    /// No configured or built-in profile with this name.
    #[error("unknown migration profile: {0}")]
    UnknownProfile(String),
}
