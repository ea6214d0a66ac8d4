use clap::Subcommand;

/// Artifact commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ArtifactCommands {
    /// Submit a presentation or report.
    Submit {
        team_id: String,
        /// presentation or report
        #[arg(long)]
        kind: String,
        #[arg(long)]
        uri: String,
    },
    /// Approve a submitted artifact.
    Approve {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Reject a submitted artifact.
    Reject {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Submission history for a team.
    List {
        team_id: String,
        #[arg(long)]
        kind: Option<String>,
    },
}
