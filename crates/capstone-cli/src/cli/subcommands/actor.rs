use clap::Subcommand;

/// Actor registry commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ActorCommands {
    /// Register an actor.
    Add {
        id: String,
        /// student, mentor or admin
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered actors.
    List {
        #[arg(long)]
        role: Option<String>,
    },
}
