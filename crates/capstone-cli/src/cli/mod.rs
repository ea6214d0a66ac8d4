use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `capstone` binary.
#[derive(Debug, Parser)]
#[command(name = "capstone", version, about = "Capstone - team formation and project approval")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Database file (overrides database.path)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Actor performing the operation
    #[arg(long = "as", global = true, value_name = "ACTOR")]
    pub actor: Option<String>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            db: self.db.clone(),
            actor: self.actor.clone(),
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::subcommands::{InviteCommands, TeamCommands};
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "capstone", "--format", "raw", "--as", "alice", "--db", "/tmp/c.db", "sweep",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        let flags = cli.global_flags();
        assert_eq!(flags.actor.as_deref(), Some("alice"));
        assert_eq!(flags.db.as_deref(), Some("/tmp/c.db"));
        assert!(matches!(cli.command, Commands::Sweep(_)));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["capstone", "invite", "accept", "inv-1a2b3c4d", "--as", "bob", "--quiet"])
            .expect("cli should parse");

        assert!(cli.quiet);
        assert_eq!(cli.actor.as_deref(), Some("bob"));
        match cli.command {
            Commands::Invite { action: InviteCommands::Accept { id } } => assert_eq!(id, "inv-1a2b3c4d"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn team_declare_takes_many_members() {
        let cli = Cli::try_parse_from(["capstone", "team", "declare", "alice", "bob", "--as", "root"])
            .expect("cli should parse");
        match cli.command {
            Commands::Team { action: TeamCommands::Declare { members } } => {
                assert_eq!(members, vec!["alice".to_string(), "bob".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["capstone", "--format", "table", "sweep"]);
        assert!(parsed.is_err());
    }
}
