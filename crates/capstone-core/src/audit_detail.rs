//! Typed audit detail payloads.
//!
//! Each audit action can carry a structured `detail` JSON blob. These types
//! fix the shape of the common ones.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Stage;
use crate::workflow::WorkflowEvent;

/// Detail for `AuditAction::StatusChanged` and `AuditAction::Expired`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusChangedDetail {
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
}

/// Detail for `AuditAction::StageChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StageChangedDetail {
    pub from: Stage,
    pub to: Stage,
    pub event: WorkflowEvent,
    pub version: i64,
}

/// Detail for `AuditAction::Decided` on requests and artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DecisionDetail {
    pub approve: bool,
    pub comment: Option<String>,
    /// Request revision or artifact kind the decision applies to.
    pub subject: String,
}

/// Detail for `AuditAction::MemberAdded`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MemberAddedDetail {
    pub member_id: String,
    pub invitation_id: Option<String>,
}

/// Detail for `AuditAction::MentorBound`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MentorBoundDetail {
    pub mentor_id: String,
    pub invitation_id: Option<String>,
}
