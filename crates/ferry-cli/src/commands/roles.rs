//! `ferry roles create|assign`.

use super::Context;
use anyhow::{Context as _, Result};
use ferry_core::{IdentityRef, SourceKind};
use ferry_runtime::{RunOutcome, assign_roles_to, create_roles};
use std::fs;
use std::path::{Path, PathBuf};

/// Role names from a newline-delimited file. Blank lines and `#` comments are ignored.
pub fn read_role_file(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn push_unique(names: &mut Vec<String>, more: impl IntoIterator<Item = String>) {
    for name in more {
        let name = name.trim().to_string();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
}

pub async fn create(
    ctx: &Context,
    names: Vec<String>,
    from_file: Option<PathBuf>,
    from_db: bool,
) -> Result<RunOutcome> {
    let mut all = Vec::new();
    push_unique(&mut all, names);
    if let Some(path) = &from_file {
        push_unique(&mut all, read_role_file(path)?);
    }
    if from_db {
        let store = ctx.store(SourceKind::Users).await?;
        push_unique(
            &mut all,
            ferry_adapter_pg::export::fetch_role_names(store.pool()).await?,
        );
    }
    if all.is_empty() {
        anyhow::bail!("no role names given; pass names, --from-file or --from-db");
    }

    let provider = ctx.provider()?;
    let audit = ctx.audit_log(&ctx.config.audit.role_log_file)?;
    tracing::info!(count = all.len(), "Creating roles");

    let report = create_roles(&provider, &audit, &all).await?;
    println!(
        "Roles: {} created, {} already present, {} failed",
        report.created, report.existing, report.failed
    );
    Ok(report.outcome())
}

pub async fn assign(ctx: &Context, identity: &str, roles: &str) -> Result<RunOutcome> {
    let provider = ctx.provider()?;
    let audit = ctx.audit_log(&ctx.config.audit.role_log_file)?;
    let identity = IdentityRef::new(identity);

    let assignment = assign_roles_to(&provider, &audit, &identity, roles).await?;
    if assignment.is_noop() {
        println!("No roles to assign");
    } else {
        println!(
            "Assigned {:?} to {} ({} errors)",
            assignment.assigned,
            identity,
            assignment.error_count()
        );
    }
    Ok(RunOutcome::from_error_count(assignment.error_count()))
}
