//! In-memory fakes of the provider and store seams.

#![allow(dead_code)]

use async_trait::async_trait;
use ferry_core::{
    BearerToken, IdentityRef, NewUser, PasswordCredential, RoleRepresentation, SourceRecord,
};
use ferry_runtime::token::now;
use ferry_runtime::{
    IdentityProvider, MappingWriter, MigratedSource, ProviderError, RecordSource, RoleCreation,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct Calls {
    pub tokens: usize,
    pub created: Vec<NewUser>,
    pub role_lookups: Vec<String>,
    pub role_mappings: Vec<(String, Vec<String>)>,
    pub passwords: Vec<(String, String)>,
    pub roles_created: Vec<String>,
}

/// Identity provider that keeps everything in memory.
pub struct FakeProvider {
    pub known_roles: BTreeSet<String>,
    pub existing_roles: BTreeSet<String>,
    pub rejected_usernames: BTreeSet<String>,
    pub fail_token: bool,
    /// Tokens handed out before acquisition starts failing.
    pub token_limit: Option<usize>,
    /// Age each token already has when handed out.
    pub issued_token_age: Duration,
    pub fail_role_mapping: bool,
    pub fail_passwords: bool,
    pub calls: Mutex<Calls>,
}

impl FakeProvider {
    pub fn with_roles(roles: &[&str]) -> Self {
        Self {
            known_roles: roles.iter().map(|r| r.to_string()).collect(),
            existing_roles: BTreeSet::new(),
            rejected_usernames: BTreeSet::new(),
            fail_token: false,
            token_limit: None,
            issued_token_age: Duration::ZERO,
            fail_role_mapping: false,
            fail_passwords: false,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn reject_username(mut self, username: &str) -> Self {
        self.rejected_usernames.insert(username.to_string());
        self
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn realm(&self) -> &str {
        "test-realm"
    }

    async fn acquire_token(&self) -> Result<BearerToken, ProviderError> {
        let mut calls = self.calls();
        if self.fail_token || self.token_limit.is_some_and(|limit| calls.tokens >= limit) {
            return Err(ProviderError::Auth {
                status: 401,
                body: json!({"error": "unauthorized_client"}),
            });
        }
        calls.tokens += 1;
        let acquired_at = now().checked_sub(self.issued_token_age).unwrap_or_else(now);
        Ok(BearerToken::new(format!("token-{}", calls.tokens), acquired_at))
    }

    async fn create_user(
        &self,
        _token: &BearerToken,
        user: &NewUser,
    ) -> Result<IdentityRef, ProviderError> {
        if self.rejected_usernames.contains(&user.username) {
            return Err(ProviderError::Rejected {
                status: 409,
                body: json!({"errorMessage": "User exists with same username"}),
            });
        }
        let mut calls = self.calls();
        calls.created.push(user.clone());
        Ok(IdentityRef::new(format!("kc-{}", calls.created.len())))
    }

    async fn get_role(
        &self,
        _token: &BearerToken,
        name: &str,
    ) -> Result<RoleRepresentation, ProviderError> {
        self.calls().role_lookups.push(name.to_string());
        if self.known_roles.contains(name) {
            let mut role = RoleRepresentation::named(name);
            role.id = Some(format!("role-{}", name.to_lowercase()));
            Ok(role)
        } else {
            Err(ProviderError::NotFound(format!("role {}", name)))
        }
    }

    async fn add_realm_roles(
        &self,
        _token: &BearerToken,
        identity: &IdentityRef,
        roles: &[RoleRepresentation],
    ) -> Result<(), ProviderError> {
        if self.fail_role_mapping {
            return Err(ProviderError::Rejected {
                status: 500,
                body: json!({"error": "unknown_error"}),
            });
        }
        self.calls().role_mappings.push((
            identity.to_string(),
            roles.iter().map(|r| r.name.clone()).collect(),
        ));
        Ok(())
    }

    async fn reset_password(
        &self,
        _token: &BearerToken,
        identity: &IdentityRef,
        credential: &PasswordCredential,
    ) -> Result<(), ProviderError> {
        if self.fail_passwords {
            return Err(ProviderError::Rejected {
                status: 400,
                body: json!({"error": "invalidPasswordMinLengthMessage"}),
            });
        }
        self.calls()
            .passwords
            .push((identity.to_string(), credential.value.clone()));
        Ok(())
    }

    async fn create_role(
        &self,
        _token: &BearerToken,
        name: &str,
    ) -> Result<RoleCreation, ProviderError> {
        if self.existing_roles.contains(name) {
            return Ok(RoleCreation::AlreadyExists);
        }
        if name.contains(' ') {
            return Err(ProviderError::Rejected {
                status: 400,
                body: json!({"errorMessage": "invalid role name"}),
            });
        }
        self.calls().roles_created.push(name.to_string());
        Ok(RoleCreation::Created)
    }
}

/// Source table kept in memory: record id to record.
#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<BTreeMap<String, SourceRecord>>,
    pub fail_writes_for: BTreeSet<String>,
}

impl MemoryStore {
    pub fn with_records(records: Vec<SourceRecord>) -> Self {
        Self {
            rows: Mutex::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
            fail_writes_for: BTreeSet::new(),
        }
    }

    pub fn identity_of(&self, id: &str) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .get(id)
            .and_then(|r| r.identity_ref.clone())
    }
}

#[async_trait]
impl RecordSource for MemoryStore {
    async fn fetch_pending(&self) -> anyhow::Result<Vec<SourceRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_eligible())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MigratedSource for MemoryStore {
    async fn fetch_migrated(&self) -> anyhow::Result<Vec<SourceRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| !r.is_eligible())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MappingWriter for MemoryStore {
    async fn persist_mapping(&self, record_id: &str, identity: &IdentityRef) -> anyhow::Result<()> {
        if self.fail_writes_for.contains(record_id) {
            anyhow::bail!("connection reset while updating {}", record_id);
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(record_id)
            .ok_or_else(|| anyhow::anyhow!("no row with id {}", record_id))?;
        if !row.is_eligible() {
            anyhow::bail!("row {} is already mapped", record_id);
        }
        row.identity_ref = Some(identity.to_string());
        Ok(())
    }

    async fn pending_ids(&self, record_ids: &[String]) -> anyhow::Result<BTreeSet<String>> {
        let rows = self.rows.lock().unwrap();
        Ok(record_ids
            .iter()
            .filter(|id| rows.get(*id).is_some_and(|r| r.is_eligible()))
            .cloned()
            .collect())
    }
}

pub fn record(id: &str, email: &str, phone: Option<&str>, roles: Option<&str>) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        email: email.to_string(),
        first_name: Some(format!("First{}", id)),
        last_name: Some(format!("Last{}", id)),
        phone: phone.map(str::to_string),
        roles: roles.map(str::to_string),
        identity_ref: None,
    }
}
