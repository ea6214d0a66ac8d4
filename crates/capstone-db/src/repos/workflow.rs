//! Team-level workflow operations: final approval, withdrawal, stage reads.

use chrono::Utc;

use capstone_core::entities::{Notification, Team};
use capstone_core::enums::{AuditAction, EntityType, NotificationKind, Role, Stage};
use capstone_core::errors::CoreError;
use capstone_core::workflow::{WorkflowEvent, advance};

use crate::error::DatabaseError;
use crate::repos::audit::record_audit;
use crate::repos::team::{require_team, terminal_conflict, transition};
use crate::service::CapstoneService;

impl CapstoneService {
    /// Sign off a team whose report is approved.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor is the bound mentor or an admin,
    /// `Conflict` for a terminal team, `InvalidTransition` before
    /// `final_approval_pending`.
    #[tracing::instrument(skip(self))]
    pub async fn issue_final_approval(&self, team_id: &str, actor_id: &str) -> Result<Team, DatabaseError> {
        let actor = self.resolve(actor_id).await?;

        let team = {
            let _sections = self.locks().acquire(None, &[team_id]).await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let team = require_team(&tx, team_id).await?;
            if !(team.is_mentor(actor_id) || actor.is(Role::Admin)) {
                return Err(CoreError::forbidden(actor_id, "issue_final_approval", "only the bound mentor or an admin may certify").into());
            }
            if team.stage.is_terminal() {
                return Err(terminal_conflict(&team, "issue_final_approval").into());
            }
            let team = transition(&tx, &team, WorkflowEvent::IssueFinalApproval, actor_id, now, |t| {
                t.certified_by = Some(actor_id.to_string());
                t.certified_at = Some(now);
            })
            .await?;
            tx.commit().await?;
            team
        };

        self.dispatch(vec![
            Notification::new(NotificationKind::TeamCertified, Some(actor_id))
                .to(team.audience())
                .team(&team.id, team.stage),
        ])
        .await;
        Ok(team)
    }

    /// Administrative exit from any non-terminal stage.
    ///
    /// Deactivates the roster so members may join or form another team.
    /// Pending mentor invitations naming the team are expired by the next
    /// sweep, or earlier when their sender invites the same mentor again.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins, `Validation` for a blank reason,
    /// `Conflict` if the team is already terminal.
    #[tracing::instrument(skip(self, reason))]
    pub async fn withdraw_team(&self, team_id: &str, actor_id: &str, reason: &str) -> Result<Team, DatabaseError> {
        self.require_admin(actor_id, "withdraw_team").await?;
        if reason.trim().is_empty() {
            return Err(CoreError::validation("reason", "cannot be empty").into());
        }

        let team = {
            let _sections = self.locks().acquire(None, &[team_id]).await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let team = require_team(&tx, team_id).await?;
            if team.stage.is_terminal() {
                return Err(terminal_conflict(&team, "withdraw_team").into());
            }
            advance(&team, WorkflowEvent::Withdraw)?;

            tx.execute("UPDATE team_members SET active = 0 WHERE team_id = ?1", [team_id])
                .await?;
            let team = transition(&tx, &team, WorkflowEvent::Withdraw, actor_id, now, |t| {
                t.withdrawn_by = Some(actor_id.to_string());
                t.withdrawn_at = Some(now);
                t.withdrawn_reason = Some(reason.to_string());
            })
            .await?;
            record_audit(
                &tx,
                Some(actor_id),
                EntityType::Team,
                team_id,
                AuditAction::Withdrawn,
                Some(serde_json::json!({ "reason": reason })),
                now,
            )
            .await?;
            tx.commit().await?;
            team
        };

        tracing::info!(team_id, "team withdrawn");
        self.dispatch(vec![
            Notification::new(NotificationKind::TeamWithdrawn, Some(actor_id))
                .to(team.audience())
                .team(&team.id, team.stage),
        ])
        .await;
        Ok(team)
    }

    /// Read-only stage query.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown team.
    pub async fn get_team_stage(&self, team_id: &str) -> Result<Stage, DatabaseError> {
        self.current_stage(team_id).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use capstone_core::enums::{ArtifactKind, InvitationKind, InvitationStatus};
    use crate::test_support::helpers::{ADMIN, MENTOR, approved_team, mentored_team, test_service};

    #[tokio::test]
    async fn final_approval_requires_the_last_stage() {
        let env = test_service().await;
        let team = approved_team(&env.svc).await;
        let err = env.svc.issue_final_approval(&team.id, MENTOR).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
    }

    #[tokio::test]
    async fn certification_records_who_and_when() {
        let env = test_service().await;
        let team = approved_team(&env.svc).await;
        for (kind, uri) in [
            (ArtifactKind::Presentation, "s3://cap/slides.pdf"),
            (ArtifactKind::Report, "s3://cap/report.pdf"),
        ] {
            let artifact = env.svc.submit_artifact(&team.id, "bob", kind, uri).await.unwrap();
            env.svc.decide_artifact(&artifact.id, MENTOR, true, None).await.unwrap();
        }
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::FinalApprovalPending);

        let err = env.svc.issue_final_approval(&team.id, "alice").await.unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let certified = env.svc.issue_final_approval(&team.id, MENTOR).await.unwrap();
        assert_eq!(certified.stage, Stage::Certified);
        assert_eq!(certified.certified_by.as_deref(), Some(MENTOR));
        assert!(certified.certified_at.is_some());
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::Certified);

        let err = env.svc.issue_final_approval(&team.id, MENTOR).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn withdrawal_frees_members_and_freezes_the_team() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;

        let err = env.svc.withdraw_team(&team.id, MENTOR, "left school").await.unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let withdrawn = env.svc.withdraw_team(&team.id, ADMIN, "left school").await.unwrap();
        assert_eq!(withdrawn.stage, Stage::Withdrawn);
        assert_eq!(withdrawn.withdrawn_reason.as_deref(), Some("left school"));
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::Withdrawn);
        assert!(env.svc.team_for_member("alice").await.unwrap().is_none());

        let err = env
            .svc
            .save_project_draft(&team.id, "alice", "Title", "Abstract")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
        let err = env.svc.withdraw_team(&team.id, ADMIN, "again").await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        // Former members can pair up again.
        let inv = env.svc.send_invitation(InvitationKind::Teammate, "alice", "carol").await.unwrap();
        let accepted = env.svc.respond_invitation(&inv.id, "carol", true).await.unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);
        assert_ne!(accepted.team_id.as_deref(), Some(team.id.as_str()));
    }
}
