use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

// Configuration types shared across all ferry crates
pub mod config;
pub mod roles;

// Re-export commonly used config types for convenience
pub use config::{
    BatchConfig, ConfigError, FerryConfig, MigrationProfile, PasswordPolicy, ProviderConfig,
    ProviderSettings, SourceKind, UpstreamConfig, UsernameStrategy,
};
pub use roles::{merge_role_names, parse_role_list};

/// A row of the source database that may need an account at the identity provider.
///
/// Only records without an `identity_ref` are eligible for migration. The
/// identifier is carried as text so integer and UUID keys are handled alike.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Comma-joined role names, as aggregated by the source query.
    #[serde(default)]
    pub roles: Option<String>,
    #[serde(default)]
    pub identity_ref: Option<String>,
}

impl SourceRecord {
    /// True when the record has not been migrated yet.
    pub fn is_eligible(&self) -> bool {
        self.identity_ref
            .as_deref()
            .map(|r| r.trim().is_empty())
            .unwrap_or(true)
    }

    /// The phone number, if present and not blank.
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// The email address, if not blank.
    pub fn email(&self) -> Option<&str> {
        Some(self.email.trim()).filter(|e| !e.is_empty())
    }
}

/// Opaque identifier the identity provider assigns to a created account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityRef(String);

impl IdentityRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Extract the reference from a `Location` header such as
    /// `https://idp/admin/realms/acme/users/5f0c...`.
    pub fn from_location(location: &str) -> Option<Self> {
        location
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && !segment.contains(':'))
            .map(|segment| Self(segment.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer credential for the identity provider admin API.
#[derive(Clone)]
pub struct BearerToken {
    access_token: String,
    acquired_at: Instant,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>, acquired_at: Instant) -> Self {
        Self {
            access_token: access_token.into(),
            acquired_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// True once strictly more than `threshold` has elapsed since acquisition.
    pub fn is_expiring(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.acquired_at) > threshold
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

/// A realm role as returned by the provider.
///
/// Unknown fields are kept so the object can be posted back verbatim in a
/// role-mapping request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RoleRepresentation {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Payload of the provider's create-user call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Vec<String>>,
}

/// Credential body of the reset-password call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredential {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub temporary: bool,
}

impl PasswordCredential {
    /// A password the user must change on first login.
    pub fn temporary(value: impl Into<String>) -> Self {
        Self {
            kind: "password".to_string(),
            value: value.into(),
            temporary: true,
        }
    }
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("kind", &self.kind)
            .field("value", &"<redacted>")
            .field("temporary", &self.temporary)
            .finish()
    }
}
