//! The batch driver: one pass over the pending records.

use crate::creator::IdentityCreator;
use crate::error::RunError;
use crate::maintenance::ensure_roles;
use crate::password::PasswordIssuer;
use crate::provider::IdentityProvider;
use crate::roles::RoleAssigner;
use crate::store::{MappingWriter, RecordSource};
use crate::token::TokenSession;
use ferry_audit::{AuditEntry, AuditEvent, AuditSink, MappingDetail, RunDetail, UserDetail};
use ferry_core::{BatchConfig, MigrationProfile, SourceRecord, merge_role_names, parse_role_list};

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Clean,
    /// Completed, but this many per-record errors were audited.
    WithErrors(usize),
}

impl RunOutcome {
    pub fn from_error_count(errors: usize) -> Self {
        if errors == 0 {
            Self::Clean
        } else {
            Self::WithErrors(errors)
        }
    }

    /// Process exit code: 0 clean, 2 completed with errors. Aborted runs exit 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::WithErrors(_) => 2,
        }
    }
}

/// Counts per outcome for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub created: usize,
    pub persisted: usize,
    /// Records handed over that already carried an identity reference.
    pub skipped: usize,
    pub username_fallbacks: usize,
    pub create_errors: usize,
    pub role_errors: usize,
    pub password_errors: usize,
    pub persistence_errors: usize,
    pub roles_ensured: usize,
    pub token_refreshes: usize,
}

impl BatchReport {
    pub fn error_count(&self) -> usize {
        self.create_errors + self.role_errors + self.password_errors + self.persistence_errors
    }

    pub fn outcome(&self) -> RunOutcome {
        RunOutcome::from_error_count(self.error_count())
    }
}

/// Sequences creation, roles, password and mapping write for each record.
///
/// Records are processed strictly in order with a fixed delay between them.
/// Write order per record is: provider account, roles, password, then the
/// source row. A failure after creation leaves the account in place and the
/// record is reported, never retried within the run.
pub struct BatchDriver<'a, P: ?Sized, W: ?Sized> {
    provider: &'a P,
    writer: &'a W,
    audit: &'a dyn AuditSink,
    profile: &'a MigrationProfile,
    batch: &'a BatchConfig,
}

impl<'a, P, W> BatchDriver<'a, P, W>
where
    P: IdentityProvider + ?Sized,
    W: MappingWriter + ?Sized,
{
    pub fn new(
        provider: &'a P,
        writer: &'a W,
        audit: &'a dyn AuditSink,
        profile: &'a MigrationProfile,
        batch: &'a BatchConfig,
    ) -> Self {
        Self {
            provider,
            writer,
            audit,
            profile,
            batch,
        }
    }

    /// Read one snapshot from `source` and migrate it.
    ///
    /// The snapshot is checked against the writer first, so a source that
    /// does not track migrations itself (a CSV export) still only hands over
    /// records the store reports as unmapped.
    pub async fn run_pending<S>(&self, source: &S) -> Result<BatchReport, RunError>
    where
        S: RecordSource + ?Sized,
    {
        let fetched = match source.fetch_pending().await {
            Ok(records) => records,
            Err(e) => {
                self.audit_abort(format!("{:#}", e));
                return Err(RunError::Source(e));
            }
        };

        let ids: Vec<String> = fetched.iter().map(|r| r.id.clone()).collect();
        let pending = match self.writer.pending_ids(&ids).await {
            Ok(pending) => pending,
            Err(e) => {
                self.audit_abort(format!("{:#}", e));
                return Err(RunError::Source(e));
            }
        };
        let (records, stale): (Vec<_>, Vec<_>) =
            fetched.into_iter().partition(|r| pending.contains(&r.id));
        if !stale.is_empty() {
            tracing::info!(
                count = stale.len(),
                "Dropping records already migrated or missing from the source table"
            );
        }

        tracing::info!(count = records.len(), source = %self.profile.source, "Found records to migrate");
        let mut report = self.run(records).await?;
        report.skipped += stale.len();
        Ok(report)
    }

    /// Migrate `records` in order.
    pub async fn run(&self, records: Vec<SourceRecord>) -> Result<BatchReport, RunError> {
        let mut report = BatchReport::default();

        let mut session = match TokenSession::start(self.provider, self.batch.token_refresh()).await {
            Ok(session) => session,
            Err(e) => {
                self.audit_abort(e.to_string());
                return Err(RunError::Auth(e));
            }
        };

        if !self.profile.ensure_roles.is_empty() {
            let token = match session.current(self.provider).await {
                Ok(token) => token.clone(),
                Err(e) => {
                    self.audit_abort(e.to_string());
                    return Err(RunError::Auth(e));
                }
            };
            let created = ensure_roles(self.provider, self.audit, &token, &self.profile.ensure_roles).await;
            report.roles_ensured = created.created + created.existing;
        }

        let creator = IdentityCreator::new(self.provider, self.audit, self.profile);
        let mut assigner = RoleAssigner::new(self.provider, self.audit, self.batch.cache_roles);
        let issuer = self
            .profile
            .password
            .clone()
            .map(|policy| PasswordIssuer::new(self.provider, self.audit, policy));

        let total = records.len();
        for (index, record) in records.iter().enumerate() {
            if !record.is_eligible() {
                tracing::debug!(record_id = %record.id, "Record already migrated, skipping");
                report.skipped += 1;
                self.progress(index, total);
                continue;
            }
            // Pace provider traffic: wait between attempted records only.
            if report.attempted > 0 {
                tokio::time::sleep(self.batch.delay()).await;
            }
            report.attempted += 1;

            let token = match session.current(self.provider).await {
                Ok(token) => token.clone(),
                Err(e) => {
                    self.audit_abort(e.to_string());
                    tracing::error!(processed = index, total, error = %e, "Token refresh failed, aborting run");
                    return Err(RunError::Auth(e));
                }
            };

            let created = match creator.create_identity(record, &token).await {
                Ok(created) => created,
                Err(_) => {
                    report.create_errors += 1;
                    self.progress(index, total);
                    continue;
                }
            };
            report.created += 1;
            if created.username.is_fallback() {
                report.username_fallbacks += 1;
            }

            self.audit.record(AuditEntry::success(AuditEvent::CreateUser(UserDetail {
                record_id: record.id.clone(),
                email: record.email.clone(),
                username: Some(created.username.as_str().to_string()),
                first_name: record.first_name.clone(),
                last_name: record.last_name.clone(),
                phone_number: record.phone().map(str::to_string),
                identity_ref: Some(created.identity.to_string()),
                roles: record.roles.clone(),
                ..Default::default()
            })));

            let roles = merge_role_names(
                parse_role_list(record.roles.as_deref()),
                &self.profile.default_roles,
            );
            let assignment = assigner.assign_roles(&created.identity, &roles, &token).await;
            report.role_errors += assignment.error_count();

            if let Some(issuer) = &issuer
                && issuer
                    .issue_password(&created.identity, &record.email, &token)
                    .await
                    .is_err()
            {
                report.password_errors += 1;
            }

            match self.writer.persist_mapping(&record.id, &created.identity).await {
                Ok(()) => {
                    report.persisted += 1;
                    tracing::debug!(record_id = %record.id, identity = %created.identity, "Updated source record");
                }
                Err(e) => {
                    report.persistence_errors += 1;
                    self.audit.record(AuditEntry::error(AuditEvent::UpdateDb(MappingDetail {
                        record_id: record.id.clone(),
                        identity_ref: created.identity.to_string(),
                        error: Some(serde_json::Value::String(format!("{:#}", e))),
                    })));
                    tracing::error!(
                        record_id = %record.id,
                        identity = %created.identity,
                        error = %e,
                        "Error updating source record"
                    );
                }
            }

            self.progress(index, total);
        }

        report.token_refreshes = session.refreshes();
        tracing::info!(
            attempted = report.attempted,
            created = report.created,
            persisted = report.persisted,
            errors = report.error_count(),
            token_refreshes = report.token_refreshes,
            "Migration completed"
        );
        Ok(report)
    }

    fn progress(&self, index: usize, total: usize) {
        if is_progress_point(index + 1, self.batch.progress_every) {
            tracing::info!(processed = index + 1, total, "Progress");
        }
    }

    fn audit_abort(&self, error: String) {
        self.audit.record(AuditEntry::error(AuditEvent::Migration(RunDetail {
            message: Some("Migration aborted".to_string()),
            error: Some(serde_json::Value::String(error)),
        })));
    }
}

/// Whether a progress line is due after `processed` records. Zero disables it.
fn is_progress_point(processed: usize, every: usize) -> bool {
    every > 0 && processed > 0 && processed % every == 0
}
