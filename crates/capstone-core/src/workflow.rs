//! The submission workflow state machine.
//!
//! Two views of the same machine live here:
//! - [`advance`] applies an event to a team's persisted stage and refuses
//!   anything outside the transition table.
//! - [`derive_stage`] recomputes the stage from the records that drive it, so
//!   reads can verify the persisted pointer never drifts from its inputs.
//!
//! ```text
//! forming                 --submit_request (roster full, mentor bound)--> awaiting_mentor_approval
//! awaiting_mentor_approval --approve_request-->                           awaiting_presentation
//! awaiting_mentor_approval --deny_request-->                              changes_requested
//! changes_requested       --resubmit_request-->                           awaiting_mentor_approval
//! awaiting_presentation   --approve_presentation-->                       awaiting_report
//! awaiting_presentation   --reject_presentation-->                        awaiting_presentation
//! awaiting_report         --approve_report-->                             final_approval_pending
//! awaiting_report         --reject_report-->                              awaiting_report
//! final_approval_pending  --issue_final_approval-->                       certified
//! any non-terminal        --withdraw-->                                   withdrawn
//! ```
//!
//! `submit_artifact` is a self-loop accepted in the three deliverable stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::Team;
use crate::enums::{ArtifactKind, RequestStatus, Stage};
use crate::errors::CoreError;

/// Input events of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    SubmitRequest,
    ApproveRequest,
    DenyRequest,
    ResubmitRequest,
    ApprovePresentation,
    RejectPresentation,
    ApproveReport,
    RejectReport,
    IssueFinalApproval,
    /// Upload of a deliverable; leaves the stage unchanged.
    SubmitArtifact,
    Withdraw,
}

impl WorkflowEvent {
    /// The event a mentor decision on an artifact of `kind` produces.
    #[must_use]
    pub const fn artifact_decision(kind: ArtifactKind, approve: bool) -> Self {
        match (kind, approve) {
            (ArtifactKind::Presentation, true) => Self::ApprovePresentation,
            (ArtifactKind::Presentation, false) => Self::RejectPresentation,
            (ArtifactKind::Report, true) => Self::ApproveReport,
            (ArtifactKind::Report, false) => Self::RejectReport,
        }
    }

    /// The event a mentor decision on the project request produces.
    #[must_use]
    pub const fn request_decision(approve: bool) -> Self {
        if approve {
            Self::ApproveRequest
        } else {
            Self::DenyRequest
        }
    }

    /// Decisions are reserved for the bound mentor or an admin.
    #[must_use]
    pub const fn is_decision(self) -> bool {
        matches!(
            self,
            Self::ApproveRequest
                | Self::DenyRequest
                | Self::ApprovePresentation
                | Self::RejectPresentation
                | Self::ApproveReport
                | Self::RejectReport
                | Self::IssueFinalApproval
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubmitRequest => "submit_request",
            Self::ApproveRequest => "approve_request",
            Self::DenyRequest => "deny_request",
            Self::ResubmitRequest => "resubmit_request",
            Self::ApprovePresentation => "approve_presentation",
            Self::RejectPresentation => "reject_presentation",
            Self::ApproveReport => "approve_report",
            Self::RejectReport => "reject_report",
            Self::IssueFinalApproval => "issue_final_approval",
            Self::SubmitArtifact => "submit_artifact",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw transition table, without guards.
#[must_use]
pub fn next_stage(stage: Stage, event: WorkflowEvent) -> Option<Stage> {
    use WorkflowEvent as E;

    match (stage, event) {
        (Stage::Forming, E::SubmitRequest)
        | (Stage::ChangesRequested, E::ResubmitRequest) => Some(Stage::AwaitingMentorApproval),
        (Stage::AwaitingMentorApproval, E::ApproveRequest) => Some(Stage::AwaitingPresentation),
        (Stage::AwaitingMentorApproval, E::DenyRequest) => Some(Stage::ChangesRequested),
        (Stage::AwaitingPresentation, E::ApprovePresentation) => Some(Stage::AwaitingReport),
        (Stage::AwaitingPresentation, E::RejectPresentation) => Some(Stage::AwaitingPresentation),
        (Stage::AwaitingReport, E::ApproveReport) => Some(Stage::FinalApprovalPending),
        (Stage::AwaitingReport, E::RejectReport) => Some(Stage::AwaitingReport),
        (Stage::FinalApprovalPending, E::IssueFinalApproval) => Some(Stage::Certified),
        (stage, E::SubmitArtifact) if stage.accepts_artifacts() => Some(stage),
        (stage, E::Withdraw) if !stage.is_terminal() => Some(Stage::Withdrawn),
        _ => None,
    }
}

/// Apply `event` to the team's current stage.
///
/// The submit guard (roster full and mentor bound) is checked here so every
/// caller shares it.
///
/// # Errors
///
/// Returns `CoreError::InvalidTransition` when the event is not in the table
/// for the team's stage, or the submit guard does not hold.
pub fn advance(team: &Team, event: WorkflowEvent) -> Result<Stage, CoreError> {
    if event == WorkflowEvent::SubmitRequest && !(team.is_complete() && team.mentor_id.is_some()) {
        return Err(CoreError::invalid_transition(&team.id, team.stage, event));
    }
    next_stage(team.stage, event)
        .ok_or_else(|| CoreError::invalid_transition(&team.id, team.stage, event))
}

/// Persisted facts the stage is a function of.
#[derive(Debug, Clone, Copy)]
pub struct StageInputs<'a> {
    pub team: &'a Team,
    pub request_status: Option<RequestStatus>,
    pub presentation_approved: bool,
    pub report_approved: bool,
}

/// Recompute a team's stage from its records.
#[must_use]
pub fn derive_stage(inputs: &StageInputs<'_>) -> Stage {
    if inputs.team.withdrawn_at.is_some() {
        return Stage::Withdrawn;
    }
    if inputs.team.certified_at.is_some() {
        return Stage::Certified;
    }
    match inputs.request_status {
        None | Some(RequestStatus::Draft) => Stage::Forming,
        Some(RequestStatus::Submitted) => Stage::AwaitingMentorApproval,
        Some(RequestStatus::ChangesRequested) => Stage::ChangesRequested,
        Some(RequestStatus::Approved) if !inputs.presentation_approved => {
            Stage::AwaitingPresentation
        }
        Some(RequestStatus::Approved) if !inputs.report_approved => Stage::AwaitingReport,
        Some(RequestStatus::Approved) => Stage::FinalApprovalPending,
    }
}
