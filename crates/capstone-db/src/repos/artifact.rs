//! Document registry: presentation and report submissions and decisions.

use chrono::Utc;

use capstone_core::audit_detail::DecisionDetail;
use capstone_core::entities::{Artifact, Notification};
use capstone_core::enums::{
    ArtifactKind, ArtifactStatus, AuditAction, EntityType, NotificationKind, Role,
};
use capstone_core::errors::CoreError;
use capstone_core::ids::PREFIX_ARTIFACT;
use capstone_core::validation::validate_uri;
use capstone_core::workflow::{WorkflowEvent, advance};

use crate::error::{DatabaseError, on_unique};
use crate::helpers::{generate_id, get_opt_datetime, get_opt_string, parse_datetime, parse_enum};
use crate::repos::audit::{record_audit, to_detail};
use crate::repos::team::{require_team, terminal_conflict, transition};
use crate::service::CapstoneService;

const SELECT_COLS: &str = "id, team_id, kind, uri, status, submitted_by, submitted_at, \
     decided_by, decided_at, decision_comment";

fn row_to_artifact(row: &libsql::Row) -> Result<Artifact, DatabaseError> {
    Ok(Artifact {
        id: row.get(0)?,
        team_id: row.get(1)?,
        kind: parse_enum(&row.get::<String>(2)?)?,
        uri: row.get(3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        submitted_by: row.get(5)?,
        submitted_at: parse_datetime(&row.get::<String>(6)?)?,
        decided_by: get_opt_string(row, 7)?,
        decided_at: get_opt_datetime(row, 8)?,
        decision_comment: get_opt_string(row, 9)?,
    })
}

async fn load_artifact(conn: &libsql::Connection, id: &str) -> Result<Option<Artifact>, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM artifacts WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_artifact(&row)?)),
        None => Ok(None),
    }
}

/// A team's artifacts, newest first, optionally of one kind.
pub(crate) async fn load_artifacts(
    conn: &libsql::Connection,
    team_id: &str,
    kind: Option<ArtifactKind>,
) -> Result<Vec<Artifact>, DatabaseError> {
    let mut rows = match kind {
        Some(kind) => {
            conn.query(
                &format!(
                    "SELECT {SELECT_COLS} FROM artifacts WHERE team_id = ?1 AND kind = ?2
                     ORDER BY submitted_at DESC, rowid DESC"
                ),
                libsql::params![team_id, kind.as_str()],
            )
            .await?
        }
        None => {
            conn.query(
                &format!(
                    "SELECT {SELECT_COLS} FROM artifacts WHERE team_id = ?1
                     ORDER BY submitted_at DESC, rowid DESC"
                ),
                [team_id],
            )
            .await?
        }
    };
    let mut artifacts = Vec::new();
    while let Some(row) = rows.next().await? {
        artifacts.push(row_to_artifact(&row)?);
    }
    Ok(artifacts)
}

/// Status of the undecided or approved artifact of `kind`, if one exists.
async fn blocking_status(
    conn: &libsql::Connection,
    team_id: &str,
    kind: ArtifactKind,
) -> Result<Option<(String, ArtifactStatus)>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT id, status FROM artifacts
             WHERE team_id = ?1 AND kind = ?2 AND status IN ('submitted', 'approved')
             ORDER BY status = 'approved' DESC LIMIT 1",
            libsql::params![team_id, kind.as_str()],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some((row.get::<String>(0)?, parse_enum(&row.get::<String>(1)?)?))),
        None => Ok(None),
    }
}

impl CapstoneService {
    /// Record a deliverable for review.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad uri, `Forbidden` for non-members,
    /// `InvalidTransition` before the request is approved, `Conflict` for a
    /// terminal team or when the kind is already under review or approved.
    #[tracing::instrument(skip(self, uri))]
    pub async fn submit_artifact(
        &self,
        team_id: &str,
        actor_id: &str,
        kind: ArtifactKind,
        uri: &str,
    ) -> Result<Artifact, DatabaseError> {
        validate_uri(uri)?;

        let (artifact, note) = {
            let _sections = self.locks().acquire(None, &[team_id]).await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let team = require_team(&tx, team_id).await?;
            if !team.is_member(actor_id) {
                return Err(CoreError::forbidden(actor_id, "submit_artifact", "only team members may submit artifacts").into());
            }
            if team.stage.is_terminal() {
                return Err(terminal_conflict(&team, "submit_artifact").into());
            }
            advance(&team, WorkflowEvent::SubmitArtifact)?;

            if let Some((existing, status)) = blocking_status(&tx, team_id, kind).await? {
                let reason = match status {
                    ArtifactStatus::Approved => format!("{kind} is already approved"),
                    _ => format!("{kind} {existing} is awaiting a decision"),
                };
                return Err(CoreError::conflict(EntityType::Artifact, existing, status, "submit_artifact", reason).into());
            }

            let artifact = Artifact {
                id: generate_id(&tx, PREFIX_ARTIFACT).await?,
                team_id: team_id.to_string(),
                kind,
                uri: uri.to_string(),
                status: ArtifactStatus::Submitted,
                submitted_by: actor_id.to_string(),
                submitted_at: now,
                decided_by: None,
                decided_at: None,
                decision_comment: None,
            };
            tx.execute(
                "INSERT INTO artifacts (id, team_id, kind, uri, status, submitted_by, submitted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                libsql::params![
                    artifact.id.as_str(),
                    team_id,
                    kind.as_str(),
                    uri,
                    ArtifactStatus::Submitted.as_str(),
                    actor_id,
                    now.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| {
                on_unique(e, || {
                    CoreError::stale(EntityType::Artifact, team_id, ArtifactStatus::Submitted, "submit_artifact")
                })
            })?;

            record_audit(
                &tx,
                Some(actor_id),
                EntityType::Artifact,
                &artifact.id,
                AuditAction::Created,
                to_detail(&serde_json::json!({ "team_id": team_id, "kind": kind }))?,
                now,
            )
            .await?;
            tx.commit().await?;

            let note = Notification::new(NotificationKind::ArtifactSubmitted, Some(actor_id))
                .to(team.audience())
                .team(&team.id, team.stage)
                .artifact(&artifact.id);
            (artifact, note)
        };

        tracing::info!(artifact_id = %artifact.id, team_id, kind = %kind, "artifact submitted");
        self.dispatch(vec![note]).await;
        Ok(artifact)
    }

    /// Approve or reject a submitted artifact, advancing the team's stage.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown artifact, `Forbidden` unless the actor is
    /// the bound mentor or an admin, `Conflict` if the artifact was already
    /// decided or the team is terminal, `InvalidTransition` if the team is
    /// not awaiting this kind.
    #[tracing::instrument(skip(self, comment))]
    pub async fn decide_artifact(
        &self,
        artifact_id: &str,
        actor_id: &str,
        approve: bool,
        comment: Option<&str>,
    ) -> Result<Artifact, DatabaseError> {
        let not_found = || CoreError::not_found(EntityType::Artifact, artifact_id);
        let actor = self.resolve(actor_id).await?;
        let seen = {
            let conn = self.reader().await?;
            load_artifact(&conn, artifact_id).await?.ok_or_else(not_found)?
        };

        let (artifact, note) = {
            let _sections = self.locks().acquire(None, &[seen.team_id.as_str()]).await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let current = load_artifact(&tx, artifact_id).await?.ok_or_else(not_found)?;
            let team = require_team(&tx, &current.team_id).await?;
            if !(team.is_mentor(actor_id) || actor.is(Role::Admin)) {
                return Err(CoreError::forbidden(actor_id, "decide_artifact", "only the bound mentor or an admin may decide").into());
            }
            if team.stage.is_terminal() {
                return Err(terminal_conflict(&team, "decide_artifact").into());
            }
            if current.status != ArtifactStatus::Submitted {
                return Err(CoreError::conflict(
                    EntityType::Artifact,
                    artifact_id,
                    current.status,
                    "decide_artifact",
                    format!("artifact is already {}", current.status),
                )
                .into());
            }

            let event = WorkflowEvent::artifact_decision(current.kind, approve);
            advance(&team, event)?;

            let status = if approve { ArtifactStatus::Approved } else { ArtifactStatus::Rejected };
            let affected = tx
                .execute(
                    "UPDATE artifacts SET status = ?1, decided_by = ?2, decided_at = ?3, decision_comment = ?4
                     WHERE id = ?5 AND status = 'submitted'",
                    libsql::params![status.as_str(), actor_id, now.to_rfc3339(), comment, artifact_id],
                )
                .await?;
            if affected == 0 {
                return Err(CoreError::stale(EntityType::Artifact, artifact_id, current.status, "decide_artifact").into());
            }

            let team = transition(&tx, &team, event, actor_id, now, |_| {}).await?;
            let detail = DecisionDetail {
                approve,
                comment: comment.map(String::from),
                subject: current.kind.as_str().to_string(),
            };
            record_audit(&tx, Some(actor_id), EntityType::Artifact, artifact_id, AuditAction::Decided, to_detail(&detail)?, now).await?;
            tx.commit().await?;

            let artifact = Artifact {
                status,
                decided_by: Some(actor_id.to_string()),
                decided_at: Some(now),
                decision_comment: comment.map(String::from),
                ..current
            };
            let kind = if approve { NotificationKind::ArtifactApproved } else { NotificationKind::ArtifactRejected };
            let note = Notification::new(kind, Some(actor_id))
                .to(team.audience())
                .team(&team.id, team.stage)
                .artifact(artifact_id);
            (artifact, note)
        };

        self.dispatch(vec![note]).await;
        Ok(artifact)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown artifact.
    pub async fn get_artifact(&self, artifact_id: &str) -> Result<Artifact, DatabaseError> {
        let conn = self.reader().await?;
        load_artifact(&conn, artifact_id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityType::Artifact, artifact_id).into())
    }

    /// Full submission history for a team, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_artifacts(
        &self,
        team_id: &str,
        kind: Option<ArtifactKind>,
    ) -> Result<Vec<Artifact>, DatabaseError> {
        let conn = self.reader().await?;
        load_artifacts(&conn, team_id, kind).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use capstone_core::enums::Stage;
    use crate::test_support::helpers::{ADMIN, MENTOR, MENTOR_2, approved_team, mentored_team, test_service};

    const SLIDES: &str = "https://files.example.edu/slides-v1.pdf";
    const REPORT: &str = "https://files.example.edu/report-v1.pdf";

    #[tokio::test]
    async fn artifacts_wait_for_request_approval() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        let err = env
            .svc
            .submit_artifact(&team.id, "alice", ArtifactKind::Presentation, SLIDES)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
    }

    #[tokio::test]
    async fn presentation_approval_advances_exactly_one_stage() {
        let env = test_service().await;
        let team = approved_team(&env.svc).await;
        let artifact = env
            .svc
            .submit_artifact(&team.id, "alice", ArtifactKind::Presentation, SLIDES)
            .await
            .unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Submitted);
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::AwaitingPresentation);

        let before = env.svc.get_team(&team.id).await.unwrap();
        let decided = env.svc.decide_artifact(&artifact.id, MENTOR, true, None).await.unwrap();
        assert_eq!(decided.status, ArtifactStatus::Approved);

        let after = env.svc.get_team(&team.id).await.unwrap();
        assert_eq!(after.stage, Stage::AwaitingReport);
        assert_eq!(after.version, before.version + 1);
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::AwaitingReport);
    }

    #[tokio::test]
    async fn rejection_frees_the_slot_for_a_new_upload() {
        let env = test_service().await;
        let team = approved_team(&env.svc).await;
        let first = env
            .svc
            .submit_artifact(&team.id, "alice", ArtifactKind::Presentation, SLIDES)
            .await
            .unwrap();

        let dup = env
            .svc
            .submit_artifact(&team.id, "bob", ArtifactKind::Presentation, SLIDES)
            .await
            .unwrap_err();
        assert_eq!(dup.kind(), "conflict");

        env.svc
            .decide_artifact(&first.id, MENTOR, false, Some("missing results slide"))
            .await
            .unwrap();
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::AwaitingPresentation);

        let second = env
            .svc
            .submit_artifact(&team.id, "bob", ArtifactKind::Presentation, "https://files.example.edu/slides-v2.pdf")
            .await
            .unwrap();
        let history = env.svc.list_artifacts(&team.id, Some(ArtifactKind::Presentation)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].status, ArtifactStatus::Rejected);
    }

    #[tokio::test]
    async fn report_cannot_be_approved_before_presentation() {
        let env = test_service().await;
        let team = approved_team(&env.svc).await;
        let report = env
            .svc
            .submit_artifact(&team.id, "alice", ArtifactKind::Report, REPORT)
            .await
            .unwrap();
        let err = env.svc.decide_artifact(&report.id, MENTOR, true, None).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(env.svc.get_artifact(&report.id).await.unwrap().status, ArtifactStatus::Submitted);
    }

    #[tokio::test]
    async fn decisions_check_existence_then_authority_then_status() {
        let env = test_service().await;
        let team = approved_team(&env.svc).await;
        let err = env.svc.decide_artifact("art-00000000", MENTOR, true, None).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let artifact = env
            .svc
            .submit_artifact(&team.id, "alice", ArtifactKind::Presentation, SLIDES)
            .await
            .unwrap();
        let err = env.svc.decide_artifact(&artifact.id, MENTOR_2, true, None).await.unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        env.svc.decide_artifact(&artifact.id, ADMIN, true, None).await.unwrap();
        let err = env.svc.decide_artifact(&artifact.id, MENTOR, false, None).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        let again = env
            .svc
            .submit_artifact(&team.id, "alice", ArtifactKind::Presentation, SLIDES)
            .await
            .unwrap_err();
        assert_eq!(again.kind(), "conflict");
    }

    #[tokio::test]
    async fn uri_and_membership_are_checked() {
        let env = test_service().await;
        let team = approved_team(&env.svc).await;
        let err = env
            .svc
            .submit_artifact(&team.id, "alice", ArtifactKind::Report, "two words")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        let err = env
            .svc
            .submit_artifact(&team.id, "carol", ArtifactKind::Report, REPORT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }
}
