use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Actor { action } => commands::actor::handle(&action, ctx, flags).await,
        Commands::Invite { action } => commands::invite::handle(&action, ctx, flags).await,
        Commands::Team { action } => commands::team::handle(&action, ctx, flags).await,
        Commands::Request { action } => commands::request::handle(&action, ctx, flags).await,
        Commands::Artifact { action } => commands::artifact::handle(&action, ctx, flags).await,
        Commands::Certify(args) => commands::certify::handle(&args, ctx, flags).await,
        Commands::Sweep(args) => commands::sweep::handle(&args, ctx, flags).await,
        Commands::Audit(args) => commands::audit::handle(&args, ctx, flags).await,
        Commands::Init(_) => unreachable!("init is pre-dispatched in main"),
    }
}
