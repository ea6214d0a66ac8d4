use clap::Subcommand;

/// Team commands.
#[derive(Clone, Debug, Subcommand)]
pub enum TeamCommands {
    /// Declare a team directly (admins: any roster; students: solo).
    Declare {
        #[arg(required = true)]
        members: Vec<String>,
    },
    /// Team with its request, revisions and artifacts.
    Show { team_id: String },
    /// Current workflow stage.
    Stage { team_id: String },
    /// Bind a mentor without an invitation (admin).
    #[command(name = "bind-mentor")]
    BindMentor { team_id: String, mentor_id: String },
    /// Withdraw a team (admin).
    Withdraw {
        team_id: String,
        #[arg(long)]
        reason: String,
    },
}
