use capstone_core::responses::StageResponse;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::TeamCommands;
use crate::commands::shared::actor::require_actor;
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone team`.
pub async fn handle(action: &TeamCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        TeamCommands::Declare { members } => {
            let actor = require_actor(flags)?;
            let team = ctx.service.declare_team(actor, members).await?;
            output(&team, flags.format)
        }
        TeamCommands::Show { team_id } => {
            let overview = ctx.service.team_overview(team_id).await?;
            output(&overview, flags.format)
        }
        TeamCommands::Stage { team_id } => {
            let stage = ctx.service.get_team_stage(team_id).await?;
            output(
                &StageResponse {
                    team_id: team_id.clone(),
                    stage,
                },
                flags.format,
            )
        }
        TeamCommands::BindMentor { team_id, mentor_id } => {
            let actor = require_actor(flags)?;
            let team = ctx.service.bind_mentor(team_id, actor, mentor_id).await?;
            output(&team, flags.format)
        }
        TeamCommands::Withdraw { team_id, reason } => {
            let actor = require_actor(flags)?;
            let team = ctx.service.withdraw_team(team_id, actor, reason).await?;
            output(&team, flags.format)
        }
    }
}
