//! `ferry export roles|table|pending`.

use super::Context;
use anyhow::Result;
use ferry_adapter_pg::export;
use ferry_core::SourceKind;
use ferry_runtime::{RecordSource, RunOutcome, write_snapshot};
use std::path::{Path, PathBuf};

pub async fn roles(ctx: &Context, output: &Path) -> Result<RunOutcome> {
    let store = ctx.store(SourceKind::Users).await?;
    let count = export::export_role_names(store.pool(), output).await?;
    println!("{} roles saved to {}", count, output.display());
    Ok(RunOutcome::Clean)
}

/// Default output for a table export: `customers` and `billing.customers`
/// both go to `customers.csv`.
pub fn default_table_output(table: &str) -> PathBuf {
    let name = table.rsplit('.').next().unwrap_or(table).trim_matches('"');
    PathBuf::from(format!("{}.csv", name))
}

pub async fn table(ctx: &Context, table: &str, output: Option<PathBuf>) -> Result<RunOutcome> {
    let output = output.unwrap_or_else(|| default_table_output(table));
    let store = ctx.store(SourceKind::Users).await?;
    let count = export::export_table(store.pool(), table, &output).await?;
    println!("{} rows of {} saved to {}", count, table, output.display());
    Ok(RunOutcome::Clean)
}

pub async fn pending(ctx: &Context, profile_name: &str, output: &Path) -> Result<RunOutcome> {
    let profile = ctx.config.profile(profile_name)?;
    let store = ctx.store(profile.source).await?;
    let records = store.fetch_pending().await?;
    let count = write_snapshot(output, &records)?;
    println!("{} pending records saved to {}", count, output.display());
    Ok(RunOutcome::Clean)
}
