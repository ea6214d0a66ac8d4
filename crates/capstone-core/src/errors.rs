//! Workflow error taxonomy shared by every Capstone crate.
//!
//! These are the caller-facing outcomes of a rejected operation. Storage and
//! transport failures are defined in their own crates (`DatabaseError`,
//! `ConfigError`) and wrap `CoreError` transparently.

use thiserror::Error;

use crate::enums::{EntityType, Stage};
use crate::workflow::WorkflowEvent;

/// Why an operation was refused.
///
/// Every variant is terminal for the calling operation and leaves persisted
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed or out-of-domain input.
    #[error("Validation error on '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// The actor lacks the role or relationship the action requires.
    #[error("Forbidden: {actor_id} may not {action}: {reason}")]
    Forbidden {
        actor_id: String,
        action: String,
        reason: String,
    },

    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: EntityType, id: String },

    /// A state precondition does not hold.
    ///
    /// `retry_safe` is set when the conflict came from a concurrent writer:
    /// the caller may re-read and retry.
    #[error("Conflict on {entity_type} {id} (status {status}) during {action}: {reason}")]
    Conflict {
        entity_type: EntityType,
        id: String,
        status: String,
        action: String,
        reason: String,
        retry_safe: bool,
    },

    /// The workflow event is not valid from the team's current stage.
    #[error("Invalid transition for team {team_id}: {event} is not allowed from {stage}")]
    InvalidTransition {
        team_id: String,
        stage: Stage,
        event: WorkflowEvent,
    },
}

impl CoreError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn forbidden(
        actor_id: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Forbidden {
            actor_id: actor_id.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn conflict(
        entity_type: EntityType,
        id: impl Into<String>,
        status: impl ToString,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            entity_type,
            id: id.into(),
            status: status.to_string(),
            action: action.into(),
            reason: reason.into(),
            retry_safe: false,
        }
    }

    /// A concurrent writer committed first; re-read and retry.
    pub fn stale(
        entity_type: EntityType,
        id: impl Into<String>,
        status: impl ToString,
        action: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            entity_type,
            id: id.into(),
            status: status.to_string(),
            action: action.into(),
            reason: "modified concurrently; re-fetch and retry".into(),
            retry_safe: true,
        }
    }

    pub fn invalid_transition(team_id: impl Into<String>, stage: Stage, event: WorkflowEvent) -> Self {
        Self::InvalidTransition {
            team_id: team_id.into(),
            stage,
            event,
        }
    }

    /// Stable machine-readable name for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }

    #[must_use]
    pub const fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            Self::Conflict {
                retry_safe: true,
                ..
            }
        )
    }
}
