use crate::cli::GlobalFlags;
use crate::cli::root_commands::CertifyArgs;
use crate::commands::shared::actor::require_actor;
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone certify`.
pub async fn handle(args: &CertifyArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let actor = require_actor(flags)?;
    let team = ctx.service.issue_final_approval(&args.team_id, actor).await?;
    output(&team, flags.format)
}
