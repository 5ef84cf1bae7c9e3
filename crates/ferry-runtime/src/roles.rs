//! Role resolution and assignment.

use crate::provider::IdentityProvider;
use ferry_audit::{AuditEntry, AuditEvent, AuditSink, RoleDetail};
use ferry_core::{BearerToken, IdentityRef, RoleRepresentation, parse_role_list};
use std::collections::HashMap;

/// Outcome of one `assign_roles` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignment {
    pub requested: Vec<String>,
    pub assigned: Vec<String>,
    /// Names the provider could not resolve.
    pub missing: Vec<String>,
    pub mapping_failed: bool,
}

impl RoleAssignment {
    /// Audit entries written for this assignment.
    pub fn error_count(&self) -> usize {
        self.missing.len() + usize::from(self.mapping_failed)
    }

    pub fn is_noop(&self) -> bool {
        self.requested.is_empty()
    }
}

/// Resolves role names at the provider and attaches them to identities.
///
/// With caching enabled a resolved role is looked up once per run. Misses are
/// not cached, so a role created mid-run is picked up on the next record.
pub struct RoleAssigner<'a, P: ?Sized> {
    provider: &'a P,
    audit: &'a dyn AuditSink,
    cache: Option<HashMap<String, RoleRepresentation>>,
}

impl<'a, P> RoleAssigner<'a, P>
where
    P: IdentityProvider + ?Sized,
{
    pub fn new(provider: &'a P, audit: &'a dyn AuditSink, cache_roles: bool) -> Self {
        Self {
            provider,
            audit,
            cache: cache_roles.then(HashMap::new),
        }
    }

    /// Assign a comma-joined role list as read from the source.
    pub async fn assign_role_list(
        &mut self,
        identity: &IdentityRef,
        roles: Option<&str>,
        token: &BearerToken,
    ) -> RoleAssignment {
        let names = parse_role_list(roles);
        self.assign_roles(identity, &names, token).await
    }

    /// Resolve every name and attach the resolved ones in a single call.
    ///
    /// Unresolvable names are audited and skipped. Nothing is sent when no
    /// name resolves.
    pub async fn assign_roles(
        &mut self,
        identity: &IdentityRef,
        names: &[String],
        token: &BearerToken,
    ) -> RoleAssignment {
        let mut outcome = RoleAssignment {
            requested: names.to_vec(),
            ..Default::default()
        };
        if names.is_empty() {
            return outcome;
        }

        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            match self.resolve(name, token).await {
                Ok(role) => resolved.push(role),
                Err(e) => {
                    self.audit.record(AuditEntry::error(AuditEvent::AssignRole(RoleDetail {
                        identity_ref: identity.to_string(),
                        role: Some(name.clone()),
                        error: Some(e.detail()),
                        ..Default::default()
                    })));
                    tracing::error!(identity = %identity, role = %name, error = %e, "Role not found");
                    outcome.missing.push(name.clone());
                }
            }
        }

        if resolved.is_empty() {
            return outcome;
        }

        let resolved_names: Vec<String> = resolved.iter().map(|r| r.name.clone()).collect();
        match self.provider.add_realm_roles(token, identity, &resolved).await {
            Ok(()) => {
                tracing::info!(identity = %identity, roles = ?resolved_names, "Assigned roles");
                outcome.assigned = resolved_names;
            }
            Err(e) => {
                self.audit.record(AuditEntry::error(AuditEvent::AssignRole(RoleDetail {
                    identity_ref: identity.to_string(),
                    roles: resolved_names,
                    error: Some(e.detail()),
                    ..Default::default()
                })));
                tracing::error!(identity = %identity, error = %e, "Error assigning roles");
                outcome.mapping_failed = true;
            }
        }
        outcome
    }

    async fn resolve(
        &mut self,
        name: &str,
        token: &BearerToken,
    ) -> Result<RoleRepresentation, crate::error::ProviderError> {
        if let Some(cache) = &self.cache
            && let Some(role) = cache.get(name)
        {
            return Ok(role.clone());
        }

        let role = self.provider.get_role(token, name).await?;
        if let Some(cache) = &mut self.cache {
            cache.insert(name.to_string(), role.clone());
        }
        Ok(role)
    }
}
