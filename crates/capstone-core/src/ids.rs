//! ID prefix constants.
//!
//! Ids are generated in the database as `{prefix}-{8 hex chars}` (see
//! `CapstoneDb::generate_id`). Actor ids come from the identity directory and
//! carry no enforced prefix.

pub const PREFIX_INVITATION: &str = "inv";
pub const PREFIX_TEAM: &str = "tem";
pub const PREFIX_ARTIFACT: &str = "art";
pub const PREFIX_AUDIT: &str = "aud";

pub const ALL_PREFIXES: &[&str] = &[PREFIX_INVITATION, PREFIX_TEAM, PREFIX_ARTIFACT, PREFIX_AUDIT];

/// Prefix of a generated id, if it has one we know about.
#[must_use]
pub fn prefix_of(id: &str) -> Option<&'static str> {
    let (prefix, _) = id.split_once('-')?;
    ALL_PREFIXES.iter().copied().find(|p| *p == prefix)
}
