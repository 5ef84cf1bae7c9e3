//! Migration profiles.
//!
//! A profile selects the source table, how provider accounts are shaped and
//! which follow-up steps run for each record. Two profiles are built in:
//!
//! | Profile | Source | Username | Roles | Password |
//! |---------|--------|----------|-------|----------|
//! | `users` | `"user"` + `user_roles` | phone, else email | from source | none |
//! | `customers` | `customer_user` | email | `CUSTOMER_USER` | temporary |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which source table a profile reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Users,
    Customers,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Users => write!(f, "users"),
            Self::Customers => write!(f, "customers"),
        }
    }
}

/// How the provider username is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsernameStrategy {
    /// Phone number, falling back to email (the fallback is audited as a warning).
    #[default]
    PhoneOrEmail,
    /// Always the email address.
    Email,
}

/// How temporary passwords are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum PasswordPolicy {
    /// Random alphanumeric password.
    Random {
        #[serde(default = "default_password_length")]
        length: usize,
    },
    /// Rendered from a template; `{email}` is replaced by the record's email.
    Template { template: String },
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::Random {
            length: default_password_length(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationProfile {
    pub source: SourceKind,

    #[serde(default)]
    pub username: UsernameStrategy,

    /// Roles assigned to every record in addition to its own.
    #[serde(default)]
    pub default_roles: Vec<String>,

    /// Roles created at the provider before the batch starts.
    #[serde(default)]
    pub ensure_roles: Vec<String>,

    /// Issue a temporary password after creation when set.
    #[serde(default)]
    pub password: Option<PasswordPolicy>,

    /// Prepended to the phone number in the `phoneNumber` attribute.
    #[serde(default = "default_phone_prefix")]
    pub phone_prefix: String,

    /// Audit file written by `migrate`.
    #[serde(default = "default_audit_file")]
    pub audit_file: String,

    /// Audit file written by `passwords`.
    #[serde(default = "default_password_log_file")]
    pub password_log_file: String,

    /// Read pending records from this CSV snapshot instead of the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl MigrationProfile {
    /// The staff user migration.
    pub fn users() -> Self {
        Self {
            source: SourceKind::Users,
            username: UsernameStrategy::PhoneOrEmail,
            default_roles: Vec::new(),
            ensure_roles: Vec::new(),
            password: None,
            phone_prefix: default_phone_prefix(),
            audit_file: default_audit_file(),
            password_log_file: default_password_log_file(),
            snapshot: None,
        }
    }

    /// The customer account migration.
    pub fn customers() -> Self {
        Self {
            source: SourceKind::Customers,
            username: UsernameStrategy::Email,
            default_roles: vec!["CUSTOMER_USER".to_string()],
            ensure_roles: vec!["CUSTOMER_USER".to_string()],
            password: Some(PasswordPolicy::default()),
            phone_prefix: default_phone_prefix(),
            audit_file: "customer_migration_log.csv".to_string(),
            password_log_file: "customer_password_log.csv".to_string(),
            snapshot: None,
        }
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "users" => Some(Self::users()),
            "customers" => Some(Self::customers()),
            _ => None,
        }
    }
}

fn default_phone_prefix() -> String {
    "1".to_string()
}

fn default_audit_file() -> String {
    "migration_log.csv".to_string()
}

fn default_password_log_file() -> String {
    "password_log.csv".to_string()
}

fn default_password_length() -> usize {
    16
}
