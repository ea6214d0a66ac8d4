use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::RequestStatus;

/// The live title + abstract submission for a team. One per team.
///
/// `revision` is 0 while the request is a draft, 1 after the first
/// submission, and grows by one on every resubmission.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProjectRequest {
    pub team_id: String,
    pub title: String,
    pub abstract_text: String,
    pub status: RequestStatus,
    pub revision: u32,
    pub submitted_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One submitted revision of a request, kept after later revisions replace it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestRevision {
    pub team_id: String,
    pub revision: u32,
    pub title: String,
    pub abstract_text: String,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    /// `approved` or `changes_requested` once decided.
    pub outcome: Option<RequestStatus>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_comment: Option<String>,
}
