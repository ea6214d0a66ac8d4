use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Artifact, ProjectRequest, RequestRevision};
use crate::enums::Stage;
use crate::errors::CoreError;

/// The unit of work: a roster, an optional mentor binding and a stage.
///
/// `member_ids` is kept sorted. `version` increments on every committed
/// mutation of the aggregate and guards concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub member_ids: Vec<String>,
    pub capacity: u32,
    pub mentor_id: Option<String>,
    pub stage: Stage,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub certified_by: Option<String>,
    pub certified_at: Option<DateTime<Utc>>,
    pub withdrawn_by: Option<String>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub withdrawn_reason: Option<String>,
}

impl Team {
    /// Check the constructor invariant: a non-empty roster of distinct ids
    /// that fits in `capacity`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` when the roster is empty, has
    /// duplicates, or exceeds `capacity`.
    pub fn validate_roster(member_ids: &[String], capacity: u32) -> Result<(), CoreError> {
        if capacity == 0 {
            return Err(CoreError::validation("capacity", "must be at least 1"));
        }
        if member_ids.is_empty() {
            return Err(CoreError::validation("member_ids", "roster cannot be empty"));
        }
        if member_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CoreError::validation("member_ids", "member id cannot be blank"));
        }
        let mut sorted = member_ids.to_vec();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != member_ids.len() {
            return Err(CoreError::validation("member_ids", "roster has duplicate members"));
        }
        if member_ids.len() > capacity as usize {
            return Err(CoreError::validation(
                "member_ids",
                format!("roster of {} exceeds capacity {capacity}", member_ids.len()),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_member(&self, actor_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == actor_id)
    }

    /// Roster has reached its capacity.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.member_ids.len() >= self.capacity as usize
    }

    #[must_use]
    pub fn has_room(&self) -> bool {
        !self.is_complete()
    }

    #[must_use]
    pub fn is_mentor(&self, actor_id: &str) -> bool {
        self.mentor_id.as_deref() == Some(actor_id)
    }

    /// Not withdrawn. Certified teams are still active rosters.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.withdrawn_at.is_none()
    }

    /// Everyone who should hear about a change to this team.
    #[must_use]
    pub fn audience(&self) -> Vec<String> {
        let mut out = self.member_ids.clone();
        if let Some(mentor) = &self.mentor_id {
            out.push(mentor.clone());
        }
        out
    }
}

/// Read model combining a team with its request and deliverables.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TeamOverview {
    pub team: Team,
    pub stage: Stage,
    pub request: Option<ProjectRequest>,
    pub revisions: Vec<RequestRevision>,
    pub artifacts: Vec<Artifact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn roster_within_capacity_is_valid() {
        assert!(Team::validate_roster(&ids(&["alice"]), 2).is_ok());
        assert!(Team::validate_roster(&ids(&["alice", "bob"]), 2).is_ok());
    }

    #[test]
    fn roster_bounds_are_enforced() {
        assert!(Team::validate_roster(&[], 2).is_err());
        assert!(Team::validate_roster(&ids(&["a", "b", "c"]), 2).is_err());
        assert!(Team::validate_roster(&ids(&["a", "a"]), 2).is_err());
        assert!(Team::validate_roster(&ids(&["a"]), 0).is_err());
        assert!(Team::validate_roster(&ids(&[" "]), 1).is_err());
    }
}
