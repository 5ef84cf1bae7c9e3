//! `ferry migrate`: create provider accounts for every pending record.

use super::Context;
use anyhow::Result;
use ferry_runtime::{BatchDriver, CsvSnapshot, RunOutcome};
use std::path::PathBuf;

pub async fn run(ctx: &Context, profile_name: &str, snapshot: Option<PathBuf>) -> Result<RunOutcome> {
    let profile = ctx.config.profile(profile_name)?;
    let provider = ctx.provider()?;
    let store = ctx.store(profile.source).await?;
    let audit = ctx.audit_log(&profile.audit_file)?;

    tracing::info!(
        profile = profile_name,
        source = %profile.source,
        delay_ms = ctx.config.batch.delay_ms,
        "Starting migration"
    );

    let driver = BatchDriver::new(&provider, &store, &audit, &profile, &ctx.config.batch);
    let report = match snapshot.or_else(|| profile.snapshot.clone()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "Reading pending records from snapshot");
            driver.run_pending(&CsvSnapshot::new(path)).await?
        }
        None => driver.run_pending(&store).await?,
    };

    println!(
        "Migrated {} of {} records ({} errors, {} username fallbacks). Audit log: {}",
        report.persisted,
        report.attempted,
        report.error_count(),
        report.username_fallbacks,
        audit.path().display()
    );
    Ok(report.outcome())
}
