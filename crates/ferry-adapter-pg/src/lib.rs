use async_trait::async_trait;
use ferry_core::{IdentityRef, SourceKind, SourceRecord, UpstreamConfig};
use ferry_runtime::{MappingWriter, MigratedSource, RecordSource};
use queries::Selection;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;

pub mod export;
pub mod queries;

/// Connect to the source database described by `upstream`.
pub async fn connect(upstream: &UpstreamConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(upstream.max_connections)
        .connect(&upstream.connection_string())
        .await?;
    Ok(pool)
}

/// Source records of one kind, stored in Postgres.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
    kind: SourceKind,
}

impl PgRecordStore {
    pub fn new(pool: PgPool, kind: SourceKind) -> Self {
        Self { pool, kind }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn select(&self, selection: Selection, identity: Option<&str>) -> anyhow::Result<Vec<SourceRecord>> {
        let sql = queries::select_records(self.kind, selection);
        let mut query = sqlx::query(&sql);
        if let Some(identity) = identity {
            query = query.bind(identity);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    /// The record carrying `identity`, if any.
    pub async fn find_by_identity(&self, identity: &str) -> anyhow::Result<Option<SourceRecord>> {
        let mut records = self.select(Selection::ByIdentity, Some(identity)).await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Clear the identity reference of every listed record. Returns rows updated.
    pub async fn reset_identity_refs(&self, record_ids: &[String]) -> anyhow::Result<u64> {
        if record_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(&queries::clear_mappings(self.kind))
            .bind(record_ids)
            .execute(&self.pool)
            .await?;
        tracing::info!(
            kind = %self.kind,
            requested = record_ids.len(),
            updated = result.rows_affected(),
            "Cleared identity references"
        );
        Ok(result.rows_affected())
    }
}

fn record_from_row(row: &PgRow) -> anyhow::Result<SourceRecord> {
    Ok(SourceRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        roles: row.try_get("roles")?,
        identity_ref: row.try_get("identity_ref")?,
    })
}

#[async_trait]
impl RecordSource for PgRecordStore {
    async fn fetch_pending(&self) -> anyhow::Result<Vec<SourceRecord>> {
        self.select(Selection::Pending, None).await
    }
}

#[async_trait]
impl MigratedSource for PgRecordStore {
    async fn fetch_migrated(&self) -> anyhow::Result<Vec<SourceRecord>> {
        self.select(Selection::Migrated, None).await
    }
}

#[async_trait]
impl MappingWriter for PgRecordStore {
    async fn persist_mapping(&self, record_id: &str, identity: &IdentityRef) -> anyhow::Result<()> {
        let result = sqlx::query(&queries::update_mapping(self.kind))
            .bind(identity.as_str())
            .bind(record_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() != 1 {
            anyhow::bail!(
                "no unmapped {} row with id {} (updated {})",
                self.kind,
                record_id,
                result.rows_affected()
            );
        }
        Ok(())
    }

    async fn pending_ids(&self, record_ids: &[String]) -> anyhow::Result<BTreeSet<String>> {
        let rows = sqlx::query(&queries::select_pending_ids(self.kind))
            .bind(record_ids)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(Into::into))
            .collect()
    }
}
