use capstone_core::enums::{InvitationKind, InvitationStatus};
use capstone_core::responses::RespondResponse;
use capstone_db::repos::invitation::InvitationFilter;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::InviteCommands;
use crate::commands::shared::actor::require_actor;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::{parse_enum, parse_opt_enum};
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone invite`.
pub async fn handle(action: &InviteCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        InviteCommands::Send { recipient, kind } => {
            let kind = parse_enum::<InvitationKind>(kind, "kind")?;
            let sender = require_actor(flags)?;
            let invitation = ctx.service.send_invitation(kind, sender, recipient).await?;
            output(&invitation, flags.format)
        }
        InviteCommands::Accept { id } => respond(id, true, ctx, flags).await,
        InviteCommands::Reject { id } => respond(id, false, ctx, flags).await,
        InviteCommands::List {
            to,
            from,
            kind,
            status,
            team,
            limit,
        } => {
            let filter = InvitationFilter {
                sender_id: from.clone(),
                recipient_id: to.clone(),
                kind: parse_opt_enum::<InvitationKind>(kind.as_deref(), "kind")?,
                status: parse_opt_enum::<InvitationStatus>(status.as_deref(), "status")?,
                team_id: team.clone(),
                limit: Some(effective_limit(*limit, 100)),
            };
            let invitations = ctx.service.list_invitations(&filter).await?;
            output(&invitations, flags.format)
        }
    }
}

async fn respond(id: &str, accept: bool, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let actor = require_actor(flags)?;
    let invitation = ctx.service.respond_invitation(id, actor, accept).await?;
    let team = match invitation.team_id.as_deref() {
        Some(team_id) if invitation.status == InvitationStatus::Accepted => {
            Some(ctx.service.get_team(team_id).await?)
        }
        _ => None,
    };
    output(&RespondResponse { invitation, team }, flags.format)
}
