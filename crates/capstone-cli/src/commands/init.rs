use std::path::Path;

use capstone_config::CapstoneConfig;
use capstone_core::entities::Actor;
use capstone_core::enums::Role;
use capstone_core::responses::InitResponse;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::InitArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone init`.
pub async fn handle(args: &InitArgs, config: &CapstoneConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let created = !Path::new(&config.database.path).exists();
    let ctx = AppContext::init(config.clone()).await?;

    if let Some(admin) = &args.admin {
        let known = ctx
            .service
            .list_actors(Some(Role::Admin))
            .await?
            .iter()
            .any(|a| &a.id == admin);
        if !known {
            ctx.service.register_actor(&Actor::new(admin.clone(), Role::Admin)).await?;
        }
    }

    output(
        &InitResponse {
            database: ctx.service.db().path().to_string(),
            created,
        },
        flags.format,
    )
}
