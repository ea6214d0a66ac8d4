use capstone_core::entities::Actor;
use capstone_core::enums::Role;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ActorCommands;
use crate::commands::shared::parse::{parse_enum, parse_opt_enum};
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone actor`.
pub async fn handle(action: &ActorCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        ActorCommands::Add { id, role, name } => {
            let mut actor = Actor::new(id.clone(), parse_enum::<Role>(role, "role")?);
            if let Some(name) = name {
                actor = actor.with_display_name(name.clone());
            }
            let actor = ctx.service.register_actor(&actor).await?;
            output(&actor, flags.format)
        }
        ActorCommands::List { role } => {
            let role = parse_opt_enum::<Role>(role.as_deref(), "role")?;
            let actors = ctx.service.list_actors(role).await?;
            output(&actors, flags.format)
        }
    }
}
