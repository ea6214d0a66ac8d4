use anyhow::Context;
use capstone_core::responses::SweepResponse;
use capstone_db::sweep::spawn_sweeper;
use chrono::Utc;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SweepArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone sweep`.
///
/// One pass by default; `--watch` runs the background sweeper until Ctrl-C.
pub async fn handle(args: &SweepArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    if args.watch {
        let handle = spawn_sweeper(ctx.service.clone(), ctx.config.workflow.sweep_interval());
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        let total = handle.shutdown().await;
        return output(&serde_json::json!({ "count": total }), flags.format);
    }

    let expired = ctx.service.sweep_expired_invitations(Utc::now()).await?;
    let count = u32::try_from(expired.len()).unwrap_or(u32::MAX);
    output(&SweepResponse { expired, count }, flags.format)
}
