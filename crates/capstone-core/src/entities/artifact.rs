use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ArtifactKind, ArtifactStatus};

/// A submitted deliverable. Every submission is its own record; the newest
/// record per (team, kind) is the active slot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Artifact {
    pub id: String,
    pub team_id: String,
    pub kind: ArtifactKind,
    pub uri: String,
    pub status: ArtifactStatus,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_comment: Option<String>,
}
