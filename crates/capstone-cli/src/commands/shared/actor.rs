use anyhow::bail;

use crate::cli::GlobalFlags;

/// The `--as` actor, required by every mutating command.
pub fn require_actor(flags: &GlobalFlags) -> anyhow::Result<&str> {
    match flags.actor.as_deref() {
        Some(actor) if !actor.trim().is_empty() => Ok(actor),
        _ => bail!("this command acts on someone's behalf: pass --as <actor>"),
    }
}

#[cfg(test)]
mod tests {
    use super::require_actor;
    use crate::cli::{GlobalFlags, OutputFormat};

    fn flags(actor: Option<&str>) -> GlobalFlags {
        GlobalFlags {
            format: OutputFormat::Json,
            db: None,
            actor: actor.map(String::from),
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn actor_is_required() {
        assert!(require_actor(&flags(None)).is_err());
        assert!(require_actor(&flags(Some("  "))).is_err());
        assert_eq!(require_actor(&flags(Some("alice"))).unwrap(), "alice");
    }
}
