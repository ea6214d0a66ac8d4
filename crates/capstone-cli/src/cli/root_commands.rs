use clap::{Args, Subcommand};

use crate::cli::subcommands::{
    ActorCommands, ArtifactCommands, InviteCommands, RequestCommands, TeamCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create the database and apply the schema.
    Init(InitArgs),
    /// Actor registry.
    Actor {
        #[command(subcommand)]
        action: ActorCommands,
    },
    /// Teammate and mentor invitations.
    Invite {
        #[command(subcommand)]
        action: InviteCommands,
    },
    /// Teams and rosters.
    Team {
        #[command(subcommand)]
        action: TeamCommands,
    },
    /// Project requests.
    Request {
        #[command(subcommand)]
        action: RequestCommands,
    },
    /// Presentation and report submissions.
    Artifact {
        #[command(subcommand)]
        action: ArtifactCommands,
    },
    /// Issue final approval for a team.
    Certify(CertifyArgs),
    /// Expire stale pending invitations.
    Sweep(SweepArgs),
    /// View audit trail.
    Audit(AuditArgs),
}

/// Arguments for `capstone init`.
#[derive(Clone, Debug, Args)]
pub struct InitArgs {
    /// Register this id as an admin if it is not registered yet.
    #[arg(long)]
    pub admin: Option<String>,
}

/// Arguments for `capstone certify`.
#[derive(Clone, Debug, Args)]
pub struct CertifyArgs {
    pub team_id: String,
}

/// Arguments for `capstone sweep`.
#[derive(Clone, Debug, Args)]
pub struct SweepArgs {
    /// Keep sweeping on the configured interval until interrupted.
    #[arg(long)]
    pub watch: bool,
}

/// Arguments for `capstone audit`.
#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub entity_type: Option<String>,
    #[arg(long)]
    pub entity_id: Option<String>,
    /// Only entries written by this actor.
    #[arg(long)]
    pub by: Option<String>,
    #[arg(long)]
    pub action: Option<String>,
    #[arg(long)]
    pub limit: Option<u32>,
}
