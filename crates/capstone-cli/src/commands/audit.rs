use capstone_core::enums::{AuditAction, EntityType};
use capstone_db::repos::audit::AuditFilter;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::AuditArgs;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::parse_opt_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `capstone audit`.
pub async fn handle(args: &AuditArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let filter = AuditFilter {
        entity_type: parse_opt_enum::<EntityType>(args.entity_type.as_deref(), "entity-type")?,
        entity_id: args.entity_id.clone(),
        actor_id: args.by.clone(),
        action: parse_opt_enum::<AuditAction>(args.action.as_deref(), "action")?,
        limit: Some(effective_limit(args.limit, 50)),
    };
    let entries = ctx.service.query_audit(&filter).await?;
    output(&entries, flags.format)
}
