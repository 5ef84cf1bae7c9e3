use async_trait::async_trait;
use std::collections::BTreeSet;
use ferry_core::{IdentityRef, SourceRecord};

/// Produces the records that still need an identity.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// One consistent snapshot of records without an identity reference.
    async fn fetch_pending(&self) -> anyhow::Result<Vec<SourceRecord>>;
}

/// Writes identity references back onto source records.
#[async_trait]
pub trait MappingWriter: Send + Sync {
    /// Set the identity reference of the record keyed by `record_id`.
    ///
    /// Fails when the record is missing or already carries a reference; an
    /// existing mapping is never repointed.
    async fn persist_mapping(&self, record_id: &str, identity: &IdentityRef)
    -> anyhow::Result<()>;

    /// The subset of `record_ids` whose records exist and have no identity
    /// reference yet.
    async fn pending_ids(&self, record_ids: &[String]) -> anyhow::Result<BTreeSet<String>>;
}

/// Produces records that already carry an identity reference.
#[async_trait]
pub trait MigratedSource: Send + Sync {
    async fn fetch_migrated(&self) -> anyhow::Result<Vec<SourceRecord>>;
}
