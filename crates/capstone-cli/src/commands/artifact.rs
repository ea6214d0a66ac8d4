use capstone_core::enums::ArtifactKind;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ArtifactCommands;
use crate::commands::shared::actor::require_actor;
use crate::commands::shared::parse::{parse_enum, parse_opt_enum};
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone artifact`.
pub async fn handle(action: &ArtifactCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        ArtifactCommands::Submit { team_id, kind, uri } => {
            let kind = parse_enum::<ArtifactKind>(kind, "kind")?;
            let actor = require_actor(flags)?;
            let artifact = ctx.service.submit_artifact(team_id, actor, kind, uri).await?;
            output(&artifact, flags.format)
        }
        ArtifactCommands::Approve { id, comment } => {
            let actor = require_actor(flags)?;
            let artifact = ctx.service.decide_artifact(id, actor, true, comment.as_deref()).await?;
            output(&artifact, flags.format)
        }
        ArtifactCommands::Reject { id, comment } => {
            let actor = require_actor(flags)?;
            let artifact = ctx.service.decide_artifact(id, actor, false, comment.as_deref()).await?;
            output(&artifact, flags.format)
        }
        ArtifactCommands::List { team_id, kind } => {
            let kind = parse_opt_enum::<ArtifactKind>(kind.as_deref(), "kind")?;
            let artifacts = ctx.service.list_artifacts(team_id, kind).await?;
            output(&artifacts, flags.format)
        }
    }
}
