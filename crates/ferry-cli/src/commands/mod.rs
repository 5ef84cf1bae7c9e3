//! CLI command implementations for ferry.
//!
//! Every command returns a [`RunOutcome`](ferry_runtime::RunOutcome); `main`
//! turns it into the exit code. An `Err` means the command aborted.

pub mod check;
pub mod export;
pub mod migrate;
pub mod passwords;
pub mod reset;
pub mod roles;

use anyhow::{Context as _, Result};
use ferry_adapter_pg::PgRecordStore;
use ferry_audit::CsvAuditLog;
use ferry_core::{FerryConfig, SourceKind};
use ferry_keycloak::KeycloakClient;
use std::path::Path;

/// Loaded configuration plus constructors for the external collaborators.
pub struct Context {
    pub config: FerryConfig,
}

impl Context {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = FerryConfig::load(path)?;
        Ok(Self { config })
    }

    /// Identity provider client; fails if provider settings are incomplete.
    pub fn provider(&self) -> Result<KeycloakClient> {
        let settings = self.config.provider.resolve()?;
        tracing::debug!(?settings, "Provider settings resolved");
        Ok(KeycloakClient::new(&settings)?)
    }

    pub async fn store(&self, kind: SourceKind) -> Result<PgRecordStore> {
        let pool = ferry_adapter_pg::connect(&self.config.upstream)
            .await
            .context("connecting to the source database")?;
        Ok(PgRecordStore::new(pool, kind))
    }

    /// A fresh audit file in the configured directory.
    pub fn audit_log(&self, file_name: &str) -> Result<CsvAuditLog> {
        let path = self.config.audit_path(file_name);
        let log = CsvAuditLog::create(&path)?;
        tracing::info!(path = %path.display(), "Writing audit log");
        Ok(log)
    }
}
