//! Project request repository: drafts, submissions, mentor decisions.
//!
//! One live `project_requests` row per team, plus an append-only
//! `request_revisions` row for every submission.

use chrono::{DateTime, Utc};

use capstone_core::audit_detail::{DecisionDetail, StatusChangedDetail};
use capstone_core::entities::{Notification, ProjectRequest, RequestRevision};
use capstone_core::enums::{AuditAction, EntityType, NotificationKind, RequestStatus, Role, Stage};
use capstone_core::errors::CoreError;
use capstone_core::validation::{validate_abstract, validate_title};
use capstone_core::workflow::{WorkflowEvent, advance};

use crate::error::DatabaseError;
use crate::helpers::{get_opt_datetime, get_opt_string, get_u32, parse_datetime, parse_enum};
use crate::repos::audit::{record_audit, to_detail};
use crate::repos::team::{require_team, terminal_conflict, transition};
use crate::service::CapstoneService;

const SELECT_COLS: &str = "team_id, title, abstract_text, status, revision, submitted_by, \
     submitted_at, decided_by, decided_at, decision_comment, created_at, updated_at";

const REVISION_COLS: &str = "team_id, revision, title, abstract_text, submitted_by, submitted_at, \
     outcome, decided_by, decided_at, decision_comment";

fn row_to_request(row: &libsql::Row) -> Result<ProjectRequest, DatabaseError> {
    Ok(ProjectRequest {
        team_id: row.get(0)?,
        title: row.get(1)?,
        abstract_text: row.get(2)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        revision: get_u32(row, 4)?,
        submitted_by: get_opt_string(row, 5)?,
        submitted_at: get_opt_datetime(row, 6)?,
        decided_by: get_opt_string(row, 7)?,
        decided_at: get_opt_datetime(row, 8)?,
        decision_comment: get_opt_string(row, 9)?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
        updated_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

fn row_to_revision(row: &libsql::Row) -> Result<RequestRevision, DatabaseError> {
    Ok(RequestRevision {
        team_id: row.get(0)?,
        revision: get_u32(row, 1)?,
        title: row.get(2)?,
        abstract_text: row.get(3)?,
        submitted_by: row.get(4)?,
        submitted_at: parse_datetime(&row.get::<String>(5)?)?,
        outcome: get_opt_string(row, 6)?.map(|s| parse_enum(&s)).transpose()?,
        decided_by: get_opt_string(row, 7)?,
        decided_at: get_opt_datetime(row, 8)?,
        decision_comment: get_opt_string(row, 9)?,
    })
}

pub(crate) async fn load_request(
    conn: &libsql::Connection,
    team_id: &str,
) -> Result<Option<ProjectRequest>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM project_requests WHERE team_id = ?1"),
            [team_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_request(&row)?)),
        None => Ok(None),
    }
}

/// Submitted revisions, oldest first.
pub(crate) async fn load_revisions(
    conn: &libsql::Connection,
    team_id: &str,
) -> Result<Vec<RequestRevision>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {REVISION_COLS} FROM request_revisions WHERE team_id = ?1 ORDER BY revision"),
            [team_id],
        )
        .await?;
    let mut revisions = Vec::new();
    while let Some(row) = rows.next().await? {
        revisions.push(row_to_revision(&row)?);
    }
    Ok(revisions)
}

fn require_loaded(request: Option<ProjectRequest>, team_id: &str) -> Result<ProjectRequest, DatabaseError> {
    request.ok_or_else(|| DatabaseError::InvalidState(format!("request for team {team_id} vanished mid-transaction")))
}

async fn upsert_text(
    conn: &libsql::Connection,
    team_id: &str,
    title: &str,
    abstract_text: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO project_requests (team_id, title, abstract_text, status, revision, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'draft', 0, ?4, ?4)
         ON CONFLICT(team_id) DO UPDATE SET
             title = excluded.title,
             abstract_text = excluded.abstract_text,
             updated_at = excluded.updated_at",
        libsql::params![team_id, title, abstract_text, now.to_rfc3339()],
    )
    .await?;
    Ok(())
}

impl CapstoneService {
    fn check_text(&self, title: &str, abstract_text: &str) -> Result<(), CoreError> {
        validate_title(title, self.settings().title_max_chars)?;
        validate_abstract(abstract_text, self.settings().abstract_max_chars)
    }

    /// Create or edit the team's draft while it is still forming.
    ///
    /// # Errors
    ///
    /// `Validation` for bad text, `Forbidden` for non-members, `Conflict`
    /// once the team has left `forming`.
    #[tracing::instrument(skip(self, title, abstract_text))]
    pub async fn save_project_draft(
        &self,
        team_id: &str,
        actor_id: &str,
        title: &str,
        abstract_text: &str,
    ) -> Result<ProjectRequest, DatabaseError> {
        self.check_text(title, abstract_text)?;

        let _sections = self.locks().acquire(None, &[team_id]).await;
        let now = Utc::now();
        let tx = self.begin().await?;

        let team = require_team(&tx, team_id).await?;
        if !team.is_member(actor_id) {
            return Err(CoreError::forbidden(actor_id, "save_project_draft", "only team members may edit the draft").into());
        }
        if team.stage.is_terminal() {
            return Err(terminal_conflict(&team, "save_project_draft").into());
        }
        if team.stage != Stage::Forming {
            return Err(CoreError::conflict(
                EntityType::ProjectRequest,
                team_id,
                team.stage,
                "save_project_draft",
                "drafts are only edited while the team is forming",
            )
            .into());
        }

        let existed = load_request(&tx, team_id).await?.is_some();
        upsert_text(&tx, team_id, title, abstract_text, now).await?;
        let action = if existed { AuditAction::Updated } else { AuditAction::Created };
        record_audit(&tx, Some(actor_id), EntityType::ProjectRequest, team_id, action, None, now).await?;
        let request = require_loaded(load_request(&tx, team_id).await?, team_id)?;
        tx.commit().await?;

        tracing::debug!(team_id, "draft saved");
        Ok(request)
    }

    /// Submit (or resubmit after changes were requested) the team's request.
    ///
    /// # Errors
    ///
    /// `Validation` for bad text, `Forbidden` for non-members, `Conflict` for
    /// a double submit or a terminal team, `InvalidTransition` when the team
    /// is incomplete, unmentored, or past the request stages.
    #[tracing::instrument(skip(self, title, abstract_text))]
    pub async fn submit_project_request(
        &self,
        team_id: &str,
        actor_id: &str,
        title: &str,
        abstract_text: &str,
    ) -> Result<ProjectRequest, DatabaseError> {
        self.check_text(title, abstract_text)?;

        let (request, note) = {
            let _sections = self.locks().acquire(None, &[team_id]).await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let team = require_team(&tx, team_id).await?;
            if !team.is_member(actor_id) {
                return Err(CoreError::forbidden(actor_id, "submit_project_request", "only team members may submit").into());
            }
            if team.stage.is_terminal() {
                return Err(terminal_conflict(&team, "submit_project_request").into());
            }

            let existing = load_request(&tx, team_id).await?;
            if let Some(current) = &existing {
                if current.status == RequestStatus::Submitted {
                    return Err(CoreError::conflict(
                        EntityType::ProjectRequest,
                        team_id,
                        current.status,
                        "submit_project_request",
                        format!("revision {} is already awaiting a decision", current.revision),
                    )
                    .into());
                }
            }

            let event = if team.stage == Stage::ChangesRequested {
                WorkflowEvent::ResubmitRequest
            } else {
                WorkflowEvent::SubmitRequest
            };
            let team = transition(&tx, &team, event, actor_id, now, |_| {}).await?;

            let revision = existing.as_ref().map_or(0, |r| r.revision) + 1;
            upsert_text(&tx, team_id, title, abstract_text, now).await?;
            tx.execute(
                "UPDATE project_requests SET status = ?1, revision = ?2, submitted_by = ?3, submitted_at = ?4,
                     decided_by = NULL, decided_at = NULL, decision_comment = NULL
                 WHERE team_id = ?5",
                libsql::params![
                    RequestStatus::Submitted.as_str(),
                    i64::from(revision),
                    actor_id,
                    now.to_rfc3339(),
                    team_id
                ],
            )
            .await?;
            tx.execute(
                &format!("INSERT INTO request_revisions ({REVISION_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, NULL, NULL)"),
                libsql::params![team_id, i64::from(revision), title, abstract_text, actor_id, now.to_rfc3339()],
            )
            .await?;

            let detail = StatusChangedDetail {
                from: existing.as_ref().map_or(RequestStatus::Draft, |r| r.status).as_str().to_string(),
                to: RequestStatus::Submitted.as_str().to_string(),
                reason: Some(format!("revision {revision}")),
            };
            record_audit(&tx, Some(actor_id), EntityType::ProjectRequest, team_id, AuditAction::StatusChanged, to_detail(&detail)?, now).await?;

            let request = require_loaded(load_request(&tx, team_id).await?, team_id)?;
            tx.commit().await?;

            let note = Notification::new(NotificationKind::RequestSubmitted, Some(actor_id))
                .to(team.audience())
                .team(&team.id, team.stage);
            (request, note)
        };

        self.dispatch(vec![note]).await;
        Ok(request)
    }

    /// Mentor (or admin) decision on the submitted request.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor is the bound mentor or an admin,
    /// `Conflict` for a terminal team, `InvalidTransition` when no request
    /// awaits a decision.
    #[tracing::instrument(skip(self, comment))]
    pub async fn decide_project_request(
        &self,
        team_id: &str,
        actor_id: &str,
        approve: bool,
        comment: Option<&str>,
    ) -> Result<ProjectRequest, DatabaseError> {
        let actor = self.resolve(actor_id).await?;

        let (request, note) = {
            let _sections = self.locks().acquire(None, &[team_id]).await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let team = require_team(&tx, team_id).await?;
            if !(team.is_mentor(actor_id) || actor.is(Role::Admin)) {
                return Err(CoreError::forbidden(actor_id, "decide_project_request", "only the bound mentor or an admin may decide").into());
            }
            if team.stage.is_terminal() {
                return Err(terminal_conflict(&team, "decide_project_request").into());
            }
            let event = WorkflowEvent::request_decision(approve);
            advance(&team, event)?;

            let current = require_loaded(load_request(&tx, team_id).await?, team_id)?;
            let outcome = if approve { RequestStatus::Approved } else { RequestStatus::ChangesRequested };
            let affected = tx
                .execute(
                    "UPDATE project_requests SET status = ?1, decided_by = ?2, decided_at = ?3,
                         decision_comment = ?4, updated_at = ?3
                     WHERE team_id = ?5 AND status = 'submitted'",
                    libsql::params![outcome.as_str(), actor_id, now.to_rfc3339(), comment, team_id],
                )
                .await?;
            if affected == 0 {
                return Err(CoreError::stale(EntityType::ProjectRequest, team_id, current.status, "decide_project_request").into());
            }
            tx.execute(
                "UPDATE request_revisions SET outcome = ?1, decided_by = ?2, decided_at = ?3, decision_comment = ?4
                 WHERE team_id = ?5 AND revision = ?6",
                libsql::params![outcome.as_str(), actor_id, now.to_rfc3339(), comment, team_id, i64::from(current.revision)],
            )
            .await?;

            let team = transition(&tx, &team, event, actor_id, now, |_| {}).await?;
            let detail = DecisionDetail {
                approve,
                comment: comment.map(String::from),
                subject: format!("revision {}", current.revision),
            };
            record_audit(&tx, Some(actor_id), EntityType::ProjectRequest, team_id, AuditAction::Decided, to_detail(&detail)?, now).await?;

            let request = require_loaded(load_request(&tx, team_id).await?, team_id)?;
            tx.commit().await?;

            let kind = if approve { NotificationKind::RequestApproved } else { NotificationKind::ChangesRequested };
            let note = Notification::new(kind, Some(actor_id))
                .to(team.audience())
                .team(&team.id, team.stage);
            (request, note)
        };

        self.dispatch(vec![note]).await;
        Ok(request)
    }

    /// # Errors
    ///
    /// `NotFound` if the team has no request yet.
    pub async fn get_project_request(&self, team_id: &str) -> Result<ProjectRequest, DatabaseError> {
        let conn = self.reader().await?;
        load_request(&conn, team_id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityType::ProjectRequest, team_id).into())
    }

    /// Every submitted revision with its outcome, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn request_history(&self, team_id: &str) -> Result<Vec<RequestRevision>, DatabaseError> {
        let conn = self.reader().await?;
        load_revisions(&conn, team_id).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::helpers::{ADMIN, MENTOR, MENTOR_2, mentored_team, test_service};

    const TITLE: &str = "Federated course search";
    const ABSTRACT: &str = "Index every department catalogue behind one query box.";

    #[tokio::test]
    async fn submit_before_mentor_is_bound_is_invalid() {
        let env = test_service().await;
        let team = env.svc.declare_team(ADMIN, &["alice".into(), "bob".into()]).await.unwrap();
        let err = env
            .svc
            .submit_project_request(&team.id, "alice", TITLE, ABSTRACT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(env.svc.get_team(&team.id).await.unwrap().stage, Stage::Forming);
    }

    #[tokio::test]
    async fn submit_moves_team_to_mentor_review() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        let request = env
            .svc
            .submit_project_request(&team.id, "alice", TITLE, ABSTRACT)
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Submitted);
        assert_eq!(request.revision, 1);
        assert_eq!(request.submitted_by.as_deref(), Some("alice"));
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::AwaitingMentorApproval);
    }

    #[tokio::test]
    async fn double_submit_conflicts() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        env.svc.submit_project_request(&team.id, "alice", TITLE, ABSTRACT).await.unwrap();
        let err = env
            .svc
            .submit_project_request(&team.id, "bob", TITLE, ABSTRACT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
        assert_eq!(env.svc.request_history(&team.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn text_limits_are_validated() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        let long_title = "t".repeat(201);
        let err = env
            .svc
            .submit_project_request(&team.id, "alice", &long_title, ABSTRACT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        let err = env
            .svc
            .submit_project_request(&team.id, "alice", TITLE, "   ")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn only_members_submit_and_only_the_mentor_decides() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        let err = env
            .svc
            .submit_project_request(&team.id, "carol", TITLE, ABSTRACT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        env.svc.submit_project_request(&team.id, "alice", TITLE, ABSTRACT).await.unwrap();
        let err = env
            .svc
            .decide_project_request(&team.id, MENTOR_2, true, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        let err = env
            .svc
            .decide_project_request(&team.id, "alice", true, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let approved = env.svc.decide_project_request(&team.id, ADMIN, true, None).await.unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.decided_by.as_deref(), Some(ADMIN));
    }

    #[tokio::test]
    async fn deny_then_resubmit_keeps_history() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        env.svc.submit_project_request(&team.id, "alice", TITLE, ABSTRACT).await.unwrap();

        let denied = env
            .svc
            .decide_project_request(&team.id, MENTOR, false, Some("narrow the scope"))
            .await
            .unwrap();
        assert_eq!(denied.status, RequestStatus::ChangesRequested);
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::ChangesRequested);

        let resubmitted = env
            .svc
            .submit_project_request(&team.id, "bob", "Course search for one faculty", ABSTRACT)
            .await
            .unwrap();
        assert_eq!(resubmitted.revision, 2);
        assert_eq!(resubmitted.status, RequestStatus::Submitted);
        assert!(resubmitted.decision_comment.is_none());

        let history = env.svc.request_history(&team.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].outcome, Some(RequestStatus::ChangesRequested));
        assert_eq!(history[0].decision_comment.as_deref(), Some("narrow the scope"));
        assert_eq!(history[0].title, TITLE);
        assert_eq!(history[1].outcome, None);
    }

    #[tokio::test]
    async fn deciding_without_a_submission_is_invalid() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        let err = env
            .svc
            .decide_project_request(&team.id, MENTOR, true, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
    }

    #[tokio::test]
    async fn drafts_are_editable_only_while_forming() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        let draft = env.svc.save_project_draft(&team.id, "alice", "Working title", ABSTRACT).await.unwrap();
        assert_eq!(draft.status, RequestStatus::Draft);
        assert_eq!(draft.revision, 0);
        let edited = env.svc.save_project_draft(&team.id, "bob", TITLE, ABSTRACT).await.unwrap();
        assert_eq!(edited.title, TITLE);
        assert_eq!(edited.created_at, draft.created_at);
        assert_eq!(env.svc.get_team_stage(&team.id).await.unwrap(), Stage::Forming);

        env.svc.submit_project_request(&team.id, "alice", TITLE, ABSTRACT).await.unwrap();
        let err = env
            .svc
            .save_project_draft(&team.id, "alice", "Late edit", ABSTRACT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let env = test_service().await;
        let team = mentored_team(&env.svc).await;
        let err = env.svc.get_project_request(&team.id).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
