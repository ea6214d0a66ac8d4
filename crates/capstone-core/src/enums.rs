//! Roles, kinds, status enums, audit actions and entity types for Capstone.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! Status enums with state machines provide `allowed_next_states()` so storage
//! code can refuse writes that would skip or regress a lifecycle.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Role of an actor as issued by the identity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Mentor => "mentor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InvitationKind
// ---------------------------------------------------------------------------

/// What an invitation proposes: a student pairing or a team-mentor pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    Teammate,
    Mentor,
}

impl InvitationKind {
    /// Role the recipient must hold for this kind of invitation.
    #[must_use]
    pub const fn recipient_role(self) -> Role {
        match self {
            Self::Teammate => Role::Student,
            Self::Mentor => Role::Mentor,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teammate => "teammate",
            Self::Mentor => "mentor",
        }
    }
}

impl fmt::Display for InvitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InvitationStatus
// ---------------------------------------------------------------------------

/// Status of an invitation.
///
/// ```text
/// pending → accepted
///         → rejected
///         → expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl InvitationStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Rejected, Self::Expired],
            Self::Accepted | Self::Rejected | Self::Expired => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.allowed_next_states().is_empty()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Status of a team's project request.
///
/// ```text
/// draft → submitted → approved
///                   → changes_requested → submitted (revision + 1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    Approved,
    ChangesRequested,
}

impl RequestStatus {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Submitted],
            Self::Submitted => &[Self::Approved, Self::ChangesRequested],
            Self::ChangesRequested => &[Self::Submitted],
            Self::Approved => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// Deliverable kinds reviewed after the project request is approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Presentation,
    Report,
}

impl ArtifactKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Presentation => "presentation",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ArtifactStatus
// ---------------------------------------------------------------------------

/// Status of one artifact record.
///
/// ```text
/// submitted → approved
///           → rejected
/// ```
///
/// A rejected record stays rejected; resubmission creates a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Submitted,
    Approved,
    Rejected,
}

impl ArtifactStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Submitted => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A team's position in the submission workflow.
///
/// ```text
/// forming → awaiting_mentor_approval → awaiting_presentation → awaiting_report
///                 ↑          ↓                                       ↓
///           changes_requested                           final_approval_pending → certified
///
/// any non-terminal stage → withdrawn (admin)
/// ```
///
/// The event-level table lives in [`crate::workflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Forming,
    AwaitingMentorApproval,
    ChangesRequested,
    AwaitingPresentation,
    AwaitingReport,
    FinalApprovalPending,
    Certified,
    Withdrawn,
}

impl Stage {
    /// Stages reachable in one step.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Forming => &[Self::AwaitingMentorApproval, Self::Withdrawn],
            Self::AwaitingMentorApproval => &[
                Self::AwaitingPresentation,
                Self::ChangesRequested,
                Self::Withdrawn,
            ],
            Self::ChangesRequested => &[Self::AwaitingMentorApproval, Self::Withdrawn],
            Self::AwaitingPresentation => &[Self::AwaitingReport, Self::Withdrawn],
            Self::AwaitingReport => &[Self::FinalApprovalPending, Self::Withdrawn],
            Self::FinalApprovalPending => &[Self::Certified, Self::Withdrawn],
            Self::Certified | Self::Withdrawn => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Certified and withdrawn teams accept no further mutation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Certified | Self::Withdrawn)
    }

    /// Whether deliverables may be uploaded in this stage.
    #[must_use]
    pub const fn accepts_artifacts(self) -> bool {
        matches!(
            self,
            Self::AwaitingPresentation | Self::AwaitingReport | Self::FinalApprovalPending
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forming => "forming",
            Self::AwaitingMentorApproval => "awaiting_mentor_approval",
            Self::ChangesRequested => "changes_requested",
            Self::AwaitingPresentation => "awaiting_presentation",
            Self::AwaitingReport => "awaiting_report",
            Self::FinalApprovalPending => "final_approval_pending",
            Self::Certified => "certified",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Type of action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    StatusChanged,
    StageChanged,
    MemberAdded,
    MentorBound,
    Decided,
    Withdrawn,
    Expired,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::StatusChanged => "status_changed",
            Self::StageChanged => "stage_changed",
            Self::MemberAdded => "member_added",
            Self::MentorBound => "mentor_bound",
            Self::Decided => "decided",
            Self::Withdrawn => "withdrawn",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Type of entity, used in the audit trail and in error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Actor,
    Invitation,
    Team,
    ProjectRequest,
    Artifact,
    Audit,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Invitation => "invitation",
            Self::Team => "team",
            Self::ProjectRequest => "project_request",
            Self::Artifact => "artifact",
            Self::Audit => "audit",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

/// Event names published to the notification sink after a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvitationSent,
    InvitationAccepted,
    InvitationRejected,
    InvitationExpired,
    TeamFormed,
    MentorBound,
    RequestSubmitted,
    RequestApproved,
    ChangesRequested,
    ArtifactSubmitted,
    ArtifactApproved,
    ArtifactRejected,
    TeamCertified,
    TeamWithdrawn,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvitationSent => "invitation_sent",
            Self::InvitationAccepted => "invitation_accepted",
            Self::InvitationRejected => "invitation_rejected",
            Self::InvitationExpired => "invitation_expired",
            Self::TeamFormed => "team_formed",
            Self::MentorBound => "mentor_bound",
            Self::RequestSubmitted => "request_submitted",
            Self::RequestApproved => "request_approved",
            Self::ChangesRequested => "changes_requested",
            Self::ArtifactSubmitted => "artifact_submitted",
            Self::ArtifactApproved => "artifact_approved",
            Self::ArtifactRejected => "artifact_rejected",
            Self::TeamCertified => "team_certified",
            Self::TeamWithdrawn => "team_withdrawn",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
