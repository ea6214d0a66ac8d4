use clap::Subcommand;

/// Project request commands.
#[derive(Clone, Debug, Subcommand)]
pub enum RequestCommands {
    /// Save or edit the draft while the team is forming.
    Draft {
        team_id: String,
        #[arg(long)]
        title: String,
        #[arg(long = "abstract")]
        abstract_text: String,
    },
    /// Submit the request for mentor review (or resubmit after changes).
    Submit {
        team_id: String,
        #[arg(long)]
        title: String,
        #[arg(long = "abstract")]
        abstract_text: String,
    },
    /// Approve the submitted request.
    Approve {
        team_id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Request changes to the submitted request.
    Deny {
        team_id: String,
        #[arg(long)]
        comment: Option<String>,
    },
}
