//! CSV snapshots of source records.
//!
//! The layout matches the `users_with_roles.csv` export:
//!
//! ```text
//! id,email,first_name,last_name,phoneNumber,keycloak_user_id,roles
//! 1,a@x.com,Ada,Lovelace,5551234,,"ADMIN,USER"
//! ```
//!
//! Older exports left the role list unquoted, so trailing fields past the
//! header width are folded back into `roles`.

use crate::store::RecordSource;
use anyhow::Context;
use async_trait::async_trait;
use ferry_core::SourceRecord;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_HEADER: [&str; 7] = [
    "id",
    "email",
    "first_name",
    "last_name",
    "phoneNumber",
    "keycloak_user_id",
    "roles",
];

/// Pending records read from a CSV file instead of the database.
#[derive(Debug, Clone)]
pub struct CsvSnapshot {
    path: PathBuf,
}

impl CsvSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every row of the file, migrated or not.
    pub fn read_all(&self) -> anyhow::Result<Vec<SourceRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("opening snapshot {}", self.path.display()))?;

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let id_col = column("id").context("snapshot has no `id` column")?;
        let email_col = column("email");
        let first_col = column("first_name");
        let last_col = column("last_name");
        let phone_col = column("phoneNumber").or_else(|| column("phone"));
        let ref_col = column("keycloak_user_id").or_else(|| column("identity_ref"));
        let roles_col = column("roles");
        let roles_is_last = roles_col == Some(headers.len().saturating_sub(1));

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.with_context(|| format!("reading snapshot row {}", line + 2))?;
            let field = |col: Option<usize>| col.and_then(|c| row.get(c)).and_then(non_null);

            let roles = match roles_col {
                Some(c) if roles_is_last && row.len() > headers.len() => {
                    let joined: Vec<&str> = row.iter().skip(c).collect();
                    non_null(&joined.join(","))
                }
                col => field(col),
            };

            let Some(id) = field(Some(id_col)) else {
                tracing::warn!(line = line + 2, "Snapshot row without id, skipping");
                continue;
            };
            records.push(SourceRecord {
                id,
                email: field(email_col).unwrap_or_default(),
                first_name: field(first_col),
                last_name: field(last_col),
                phone: field(phone_col),
                roles,
                identity_ref: field(ref_col),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl RecordSource for CsvSnapshot {
    async fn fetch_pending(&self) -> anyhow::Result<Vec<SourceRecord>> {
        let records = self.read_all()?;
        let total = records.len();
        let pending: Vec<SourceRecord> = records.into_iter().filter(SourceRecord::is_eligible).collect();
        tracing::debug!(
            path = %self.path.display(),
            total,
            pending = pending.len(),
            "Read snapshot"
        );
        Ok(pending)
    }
}

/// Write records in the snapshot layout. Returns the number of rows written.
pub fn write_snapshot(path: impl AsRef<Path>, records: &[SourceRecord]) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating snapshot {}", path.display()))?;
    writer.write_record(SNAPSHOT_HEADER)?;
    for r in records {
        writer.write_record([
            r.id.as_str(),
            r.email.as_str(),
            r.first_name.as_deref().unwrap_or(""),
            r.last_name.as_deref().unwrap_or(""),
            r.phone.as_deref().unwrap_or(""),
            r.identity_ref.as_deref().unwrap_or(""),
            r.roles.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(records.len())
}

fn non_null(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(value.to_string())
    }
}
