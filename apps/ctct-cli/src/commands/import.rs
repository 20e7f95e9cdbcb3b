//! Bulk import commands

use super::{print_json, Context};
use crate::error::CliResult;

/// Mirror lists, custom fields, contacts and campaigns into the database.
pub async fn import(context: &Context) -> CliResult<()> {
    let report = context.importer().import_all().await?;
    print_json(&report)
}

/// Refresh campaign statistics from the summary report.
pub async fn stats(context: &Context) -> CliResult<()> {
    let report = context.importer().refresh_campaign_stats().await?;
    print_json(&report)
}

/// Record contacts who unsubscribed.
pub async fn opt_outs(context: &Context) -> CliResult<()> {
    let counts = context.importer().refresh_opt_outs().await?;
    print_json(&counts)
}
