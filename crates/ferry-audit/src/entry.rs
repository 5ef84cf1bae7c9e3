//! Audit entry types.
//!
//! An entry is a status plus a payload tagged by action kind. The payload
//! schema is fixed per action so audit files stay machine-readable (the reset
//! command reads them back).

use crate::error::AuditError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome class of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Warning,
    Error,
    Info,
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// Action kind, matching the `action` tag of [`AuditEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateUser,
    AssignRole,
    SetPassword,
    UpdateDb,
    CreateRole,
    Migration,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateUser => write!(f, "CREATE_USER"),
            Self::AssignRole => write!(f, "ASSIGN_ROLE"),
            Self::SetPassword => write!(f, "SET_PASSWORD"),
            Self::UpdateDb => write!(f, "UPDATE_DB"),
            Self::CreateRole => write!(f, "CREATE_ROLE"),
            Self::Migration => write!(f, "MIGRATION"),
        }
    }
}

/// Payload of an entry, tagged by action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    CreateUser(UserDetail),
    AssignRole(RoleDetail),
    SetPassword(PasswordDetail),
    UpdateDb(MappingDetail),
    CreateRole(RoleCreationDetail),
    Migration(RunDetail),
}

impl AuditEvent {
    pub fn action(&self) -> AuditAction {
        match self {
            Self::CreateUser(_) => AuditAction::CreateUser,
            Self::AssignRole(_) => AuditAction::AssignRole,
            Self::SetPassword(_) => AuditAction::SetPassword,
            Self::UpdateDb(_) => AuditAction::UpdateDb,
            Self::CreateRole(_) => AuditAction::CreateRole,
            Self::Migration(_) => AuditAction::Migration,
        }
    }
}

/// Identity creation for one source record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(alias = "db_user_id", alias = "customer_id")]
    pub record_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Role resolution or role-mapping for one identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleDetail {
    pub identity_ref: String,
    /// The single role that failed to resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Roles carried by a role-mapping call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Temporary password issuance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PasswordDetail {
    pub identity_ref: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Write of the identity reference back to the source row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingDetail {
    #[serde(alias = "db_user_id", alias = "customer_id")]
    pub record_id: String,
    pub identity_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Realm role creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleCreationDetail {
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Run-level failure or note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// One line of an audit file.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub status: AuditStatus,
    pub event: AuditEvent,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    status: AuditStatus,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

#[derive(Deserialize)]
struct Payload {
    status: AuditStatus,
    #[serde(flatten)]
    event: AuditEvent,
}

impl AuditEntry {
    pub fn new(status: AuditStatus, event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            status,
            event,
        }
    }

    pub fn success(event: AuditEvent) -> Self {
        Self::new(AuditStatus::Success, event)
    }

    pub fn warning(event: AuditEvent) -> Self {
        Self::new(AuditStatus::Warning, event)
    }

    pub fn error(event: AuditEvent) -> Self {
        Self::new(AuditStatus::Error, event)
    }

    pub fn info(event: AuditEvent) -> Self {
        Self::new(AuditStatus::Info, event)
    }

    pub fn action(&self) -> AuditAction {
        self.event.action()
    }

    /// The JSON object written after the timestamp.
    pub fn payload_json(&self) -> Result<String, AuditError> {
        Ok(serde_json::to_string(&PayloadRef {
            status: self.status,
            event: &self.event,
        })?)
    }

    /// Format as `timestamp,json`.
    pub fn to_line(&self) -> Result<String, AuditError> {
        Ok(format!(
            "{},{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.payload_json()?
        ))
    }

    /// Parse a `timestamp,json` line.
    pub fn parse_line(line: &str) -> Result<Self, AuditError> {
        let (timestamp, json) = line
            .split_once(',')
            .ok_or_else(|| AuditError::MalformedLine(line.to_string()))?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp.trim())
            .map_err(|e| AuditError::MalformedLine(format!("{}: {}", e, line)))?
            .with_timezone(&Utc);
        let payload: Payload = serde_json::from_str(json)?;

        Ok(Self {
            timestamp,
            status: payload.status,
            event: payload.event,
        })
    }
}
