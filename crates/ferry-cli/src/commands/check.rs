//! `ferry check`: find the source record behind an identity reference.

use super::Context;
use anyhow::Result;
use ferry_runtime::RunOutcome;

pub async fn run(ctx: &Context, profile_name: &str, identity: &str) -> Result<RunOutcome> {
    let profile = ctx.config.profile(profile_name)?;
    let store = ctx.store(profile.source).await?;

    match store.find_by_identity(identity).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No {} record carries identity {}", profile.source, identity),
    }
    Ok(RunOutcome::Clean)
}
