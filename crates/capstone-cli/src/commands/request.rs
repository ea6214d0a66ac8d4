use crate::cli::GlobalFlags;
use crate::cli::subcommands::RequestCommands;
use crate::commands::shared::actor::require_actor;
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone request`.
pub async fn handle(action: &RequestCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let actor = require_actor(flags)?;
    let request = match action {
        RequestCommands::Draft {
            team_id,
            title,
            abstract_text,
        } => ctx.service.save_project_draft(team_id, actor, title, abstract_text).await?,
        RequestCommands::Submit {
            team_id,
            title,
            abstract_text,
        } => ctx.service.submit_project_request(team_id, actor, title, abstract_text).await?,
        RequestCommands::Approve { team_id, comment } => {
            ctx.service
                .decide_project_request(team_id, actor, true, comment.as_deref())
                .await?
        }
        RequestCommands::Deny { team_id, comment } => {
            ctx.service
                .decide_project_request(team_id, actor, false, comment.as_deref())
                .await?
        }
    };
    output(&request, flags.format)
}
