//! `ferry passwords`: temporary passwords for records that are already migrated.

use super::Context;
use anyhow::Result;
use ferry_runtime::{RunOutcome, issue_passwords};

pub async fn run(ctx: &Context, profile_name: &str) -> Result<RunOutcome> {
    let profile = ctx.config.profile(profile_name)?;
    let policy = profile.password.clone().unwrap_or_default();
    let provider = ctx.provider()?;
    let store = ctx.store(profile.source).await?;
    let audit = ctx.audit_log(&profile.password_log_file)?;

    let report = issue_passwords(&provider, &store, &audit, policy, &ctx.config.batch).await?;
    println!(
        "Passwords: {} issued, {} failed, {} skipped. Audit log: {}",
        report.issued,
        report.failed,
        report.skipped,
        audit.path().display()
    );
    Ok(report.outcome())
}
