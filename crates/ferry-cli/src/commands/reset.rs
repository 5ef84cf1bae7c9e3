//! `ferry reset`: undo a migration run by clearing the identity references
//! its audit log reports as created.

use super::Context;
use anyhow::{Context as _, Result};
use ferry_audit::migrated_record_ids;
use ferry_runtime::RunOutcome;
use std::path::PathBuf;

/// Ids from the audit log minus the excluded ones, in log order.
pub fn ids_to_reset(logged: Vec<String>, exclude: &[String]) -> Vec<String> {
    logged
        .into_iter()
        .filter(|id| !exclude.iter().any(|e| e.trim() == id))
        .collect()
}

pub async fn run(
    ctx: &Context,
    profile_name: &str,
    log: Option<PathBuf>,
    exclude: &[String],
    dry_run: bool,
) -> Result<RunOutcome> {
    let profile = ctx.config.profile(profile_name)?;
    let log = log.unwrap_or_else(|| ctx.config.audit_path(&profile.audit_file));

    let logged = migrated_record_ids(&log)
        .with_context(|| format!("reading audit log {}", log.display()))?;
    let found = logged.len();
    let ids = ids_to_reset(logged, exclude);
    tracing::info!(
        log = %log.display(),
        found,
        excluded = found - ids.len(),
        "Collected record ids to reset"
    );

    if dry_run {
        for id in &ids {
            println!("{}", id);
        }
        println!("{} records would be reset", ids.len());
        return Ok(RunOutcome::Clean);
    }

    let store = ctx.store(profile.source).await?;
    let updated = store.reset_identity_refs(&ids).await?;
    println!("Reset {} of {} records", updated, ids.len());
    Ok(RunOutcome::Clean)
}
