//! Identity creation for one source record.

use crate::error::ProvisioningError;
use crate::provider::IdentityProvider;
use ferry_audit::{AuditEntry, AuditEvent, AuditSink, UserDetail};
use ferry_core::{BearerToken, IdentityRef, MigrationProfile, NewUser, SourceRecord, UsernameStrategy};
use std::collections::BTreeMap;

const EMAIL_FALLBACK_MESSAGE: &str = "Using email as username - no phone number";

/// Which field ended up as the provider username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Username {
    Phone(String),
    /// Phone-first strategy, but the record had no phone.
    EmailFallback(String),
    Email(String),
}

impl Username {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Phone(s) | Self::EmailFallback(s) | Self::Email(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::EmailFallback(_))
    }
}

/// A freshly created provider account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIdentity {
    pub identity: IdentityRef,
    pub username: Username,
}

/// Pick the username for a record, or `None` if it has nothing usable.
pub fn choose_username(record: &SourceRecord, strategy: UsernameStrategy) -> Option<Username> {
    match strategy {
        UsernameStrategy::PhoneOrEmail => match (record.phone(), record.email()) {
            (Some(phone), _) => Some(Username::Phone(phone.to_string())),
            (None, Some(email)) => Some(Username::EmailFallback(email.to_string())),
            (None, None) => None,
        },
        UsernameStrategy::Email => record.email().map(|e| Username::Email(e.to_string())),
    }
}

/// Map a source record to the provider's create-user payload.
pub fn build_new_user(record: &SourceRecord, username: &Username, phone_prefix: &str) -> NewUser {
    let mut attributes = BTreeMap::new();
    if let Some(phone) = record.phone() {
        attributes.insert(
            "phoneNumber".to_string(),
            vec![format!("{}{}", phone_prefix, phone)],
        );
    }

    NewUser {
        username: username.as_str().to_string(),
        email: record.email.trim().to_string(),
        first_name: record.first_name.clone().unwrap_or_default(),
        last_name: record.last_name.clone().unwrap_or_default(),
        enabled: true,
        attributes,
    }
}

/// Creates provider accounts for source records.
pub struct IdentityCreator<'a, P: ?Sized> {
    provider: &'a P,
    audit: &'a dyn AuditSink,
    profile: &'a MigrationProfile,
}

impl<'a, P> IdentityCreator<'a, P>
where
    P: IdentityProvider + ?Sized,
{
    pub fn new(provider: &'a P, audit: &'a dyn AuditSink, profile: &'a MigrationProfile) -> Self {
        Self {
            provider,
            audit,
            profile,
        }
    }

    /// Create the account for `record`.
    ///
    /// A username fallback is audited as a warning. A rejection is audited as
    /// an error and returned; the record stays eligible for the next run.
    pub async fn create_identity(
        &self,
        record: &SourceRecord,
        token: &BearerToken,
    ) -> Result<CreatedIdentity, ProvisioningError> {
        let Some(username) = choose_username(record, self.profile.username) else {
            let err = ProvisioningError::NoUsername(record.id.clone());
            self.audit_failure(record, None, serde_json::Value::String(err.to_string()));
            tracing::error!(record_id = %record.id, "Record has no phone number or email, skipping");
            return Err(err);
        };

        if username.is_fallback() {
            self.audit.record(AuditEntry::warning(AuditEvent::CreateUser(UserDetail {
                record_id: record.id.clone(),
                email: record.email.clone(),
                message: Some(EMAIL_FALLBACK_MESSAGE.to_string()),
                ..Default::default()
            })));
            tracing::warn!(
                record_id = %record.id,
                email = %record.email,
                "Using email as username - no phone number"
            );
        }

        let user = build_new_user(record, &username, &self.profile.phone_prefix);
        match self.provider.create_user(token, &user).await {
            Ok(identity) => {
                tracing::info!(
                    record_id = %record.id,
                    email = %record.email,
                    identity = %identity,
                    "Created user"
                );
                Ok(CreatedIdentity { identity, username })
            }
            Err(e) => {
                self.audit_failure(record, Some(&username), e.detail());
                tracing::error!(
                    record_id = %record.id,
                    email = %record.email,
                    error = %e,
                    "Error creating user"
                );
                Err(e.into())
            }
        }
    }

    fn audit_failure(
        &self,
        record: &SourceRecord,
        username: Option<&Username>,
        error: serde_json::Value,
    ) {
        self.audit.record(AuditEntry::error(AuditEvent::CreateUser(UserDetail {
            record_id: record.id.clone(),
            email: record.email.clone(),
            username: username.map(|u| u.as_str().to_string()),
            phone_number: record.phone().map(str::to_string),
            error: Some(error),
            ..Default::default()
        })));
    }
}
