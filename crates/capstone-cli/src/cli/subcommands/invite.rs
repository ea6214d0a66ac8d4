use clap::Subcommand;

/// Invitation commands. The sender or recipient is the `--as` actor.
#[derive(Clone, Debug, Subcommand)]
pub enum InviteCommands {
    /// Invite a student as teammate, or a mentor for your team.
    Send {
        recipient: String,
        /// teammate or mentor
        #[arg(long, default_value = "teammate")]
        kind: String,
    },
    /// Accept an invitation addressed to you.
    Accept { id: String },
    /// Reject an invitation addressed to you.
    Reject { id: String },
    /// List invitations.
    List {
        /// Only invitations sent to this actor.
        #[arg(long)]
        to: Option<String>,
        /// Only invitations sent by this actor.
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
}
