//! Operator workflows around the main migration: role creation, password
//! issuance for already-migrated records and ad hoc role assignment.

use crate::driver::RunOutcome;
use crate::error::RunError;
use crate::password::PasswordIssuer;
use crate::provider::{IdentityProvider, RoleCreation};
use crate::roles::{RoleAssigner, RoleAssignment};
use crate::store::MigratedSource;
use crate::token::TokenSession;
use ferry_audit::{AuditEntry, AuditEvent, AuditSink, PasswordDetail, RoleCreationDetail, RunDetail};
use ferry_core::{BatchConfig, BearerToken, IdentityRef, PasswordPolicy};

/// Counts for a role creation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCreationReport {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

impl RoleCreationReport {
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome::from_error_count(self.failed)
    }
}

/// Counts for a password issuance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordReport {
    pub issued: usize,
    pub failed: usize,
    /// Records without an identity reference.
    pub skipped: usize,
    pub token_refreshes: usize,
}

impl PasswordReport {
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome::from_error_count(self.failed)
    }
}

/// Create each named realm role. Existing roles are reported, not failed.
pub async fn ensure_roles<P>(
    provider: &P,
    audit: &dyn AuditSink,
    token: &BearerToken,
    names: &[String],
) -> RoleCreationReport
where
    P: IdentityProvider + ?Sized,
{
    let mut report = RoleCreationReport::default();
    let realm = provider.realm().to_string();

    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let detail = RoleCreationDetail {
            role_name: name.to_string(),
            realm: Some(realm.clone()),
            ..Default::default()
        };
        match provider.create_role(token, name).await {
            Ok(RoleCreation::Created) => {
                report.created += 1;
                audit.record(AuditEntry::success(AuditEvent::CreateRole(detail)));
                tracing::info!(role = name, realm = %realm, "Created role");
            }
            Ok(RoleCreation::AlreadyExists) => {
                report.existing += 1;
                audit.record(AuditEntry::info(AuditEvent::CreateRole(RoleCreationDetail {
                    message: Some("Role already exists".to_string()),
                    ..detail
                })));
                tracing::info!(role = name, realm = %realm, "Role already exists");
            }
            Err(e) => {
                report.failed += 1;
                audit.record(AuditEntry::error(AuditEvent::CreateRole(RoleCreationDetail {
                    error: Some(e.detail()),
                    ..detail
                })));
                tracing::error!(role = name, realm = %realm, error = %e, "Error creating role");
            }
        }
    }
    report
}

/// Acquire a token and create the named roles.
pub async fn create_roles<P>(
    provider: &P,
    audit: &dyn AuditSink,
    names: &[String],
) -> Result<RoleCreationReport, RunError>
where
    P: IdentityProvider + ?Sized,
{
    let token = acquire(provider, audit).await?;
    Ok(ensure_roles(provider, audit, &token, names).await)
}

/// Issue a temporary password to every already-migrated record.
pub async fn issue_passwords<P, S>(
    provider: &P,
    source: &S,
    audit: &dyn AuditSink,
    policy: PasswordPolicy,
    batch: &BatchConfig,
) -> Result<PasswordReport, RunError>
where
    P: IdentityProvider + ?Sized,
    S: MigratedSource + ?Sized,
{
    let records = source.fetch_migrated().await.map_err(|e| {
        audit_abort(audit, format!("{:#}", e));
        RunError::Source(e)
    })?;
    tracing::info!(count = records.len(), "Found migrated records");

    let mut session = match TokenSession::start(provider, batch.token_refresh()).await {
        Ok(session) => session,
        Err(e) => {
            audit_abort(audit, e.to_string());
            return Err(RunError::Auth(e));
        }
    };
    let issuer = PasswordIssuer::new(provider, audit, policy);
    let mut report = PasswordReport::default();

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(batch.delay()).await;
        }

        let Some(identity) = record
            .identity_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(IdentityRef::new)
        else {
            report.skipped += 1;
            audit.record(AuditEntry::warning(AuditEvent::SetPassword(PasswordDetail {
                email: record.email.clone(),
                error: Some(serde_json::Value::String(format!(
                    "record {} has no identity reference",
                    record.id
                ))),
                ..Default::default()
            })));
            continue;
        };

        let token = session.current(provider).await.map_err(|e| {
            audit_abort(audit, e.to_string());
            RunError::Auth(e)
        })?;
        match issuer.issue_password(&identity, &record.email, token).await {
            Ok(_) => report.issued += 1,
            Err(_) => report.failed += 1,
        }

        if batch.progress_every > 0 && (index + 1) % batch.progress_every == 0 {
            tracing::info!(processed = index + 1, total = records.len(), "Progress");
        }
    }

    report.token_refreshes = session.refreshes();
    tracing::info!(issued = report.issued, failed = report.failed, "Password issuance completed");
    Ok(report)
}

/// Assign a comma-joined role list to one identity.
pub async fn assign_roles_to<P>(
    provider: &P,
    audit: &dyn AuditSink,
    identity: &IdentityRef,
    roles: &str,
) -> Result<RoleAssignment, RunError>
where
    P: IdentityProvider + ?Sized,
{
    let token = acquire(provider, audit).await?;
    let mut assigner = RoleAssigner::new(provider, audit, false);
    Ok(assigner.assign_role_list(identity, Some(roles), &token).await)
}

async fn acquire<P>(provider: &P, audit: &dyn AuditSink) -> Result<BearerToken, RunError>
where
    P: IdentityProvider + ?Sized,
{
    provider.acquire_token().await.map_err(|e| {
        audit_abort(audit, e.to_string());
        RunError::Auth(e)
    })
}

fn audit_abort(audit: &dyn AuditSink, error: String) {
    audit.record(AuditEntry::error(AuditEvent::Migration(RunDetail {
        message: Some("Run aborted".to_string()),
        error: Some(serde_json::Value::String(error)),
    })));
}
