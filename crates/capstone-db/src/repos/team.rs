//! Team repository: rosters, mentor binding, team reads.
//!
//! The row helpers here (`load_team`, `save_team`, `transition`, ...) take a
//! connection so the invitation, request and artifact repos can run them
//! inside their own transaction.

use chrono::{DateTime, Utc};

use capstone_core::audit_detail::{MemberAddedDetail, MentorBoundDetail, StageChangedDetail};
use capstone_core::entities::{Notification, Team, TeamOverview};
use capstone_core::enums::{
    ArtifactKind, ArtifactStatus, AuditAction, EntityType, NotificationKind, RequestStatus, Role,
    Stage,
};
use capstone_core::errors::CoreError;
use capstone_core::ids::PREFIX_TEAM;
use capstone_core::workflow::{StageInputs, WorkflowEvent, advance, derive_stage};

use crate::error::{DatabaseError, on_unique};
use crate::helpers::{generate_id, get_opt_datetime, get_opt_string, get_u32, opt_rfc3339, parse_datetime, parse_enum};
use crate::repos::audit::{record_audit, to_detail};
use crate::service::CapstoneService;

const SELECT_COLS: &str = "id, capacity, mentor_id, stage, version, created_at, updated_at, \
     certified_by, certified_at, withdrawn_by, withdrawn_at, withdrawn_reason";

fn row_to_team(row: &libsql::Row) -> Result<Team, DatabaseError> {
    Ok(Team {
        id: row.get(0)?,
        member_ids: Vec::new(),
        capacity: get_u32(row, 1)?,
        mentor_id: get_opt_string(row, 2)?,
        stage: parse_enum(&row.get::<String>(3)?)?,
        version: row.get(4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
        certified_by: get_opt_string(row, 7)?,
        certified_at: get_opt_datetime(row, 8)?,
        withdrawn_by: get_opt_string(row, 9)?,
        withdrawn_at: get_opt_datetime(row, 10)?,
        withdrawn_reason: get_opt_string(row, 11)?,
    })
}

async fn load_members(conn: &libsql::Connection, team_id: &str) -> Result<Vec<String>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT member_id FROM team_members WHERE team_id = ?1 ORDER BY member_id",
            [team_id],
        )
        .await?;
    let mut members = Vec::new();
    while let Some(row) = rows.next().await? {
        members.push(row.get::<String>(0)?);
    }
    Ok(members)
}

pub(crate) async fn load_team(conn: &libsql::Connection, team_id: &str) -> Result<Option<Team>, DatabaseError> {
    let team = {
        let mut rows = conn
            .query(&format!("SELECT {SELECT_COLS} FROM teams WHERE id = ?1"), [team_id])
            .await?;
        match rows.next().await? {
            Some(row) => row_to_team(&row)?,
            None => return Ok(None),
        }
    };
    Ok(Some(Team {
        member_ids: load_members(conn, team_id).await?,
        ..team
    }))
}

pub(crate) async fn require_team(conn: &libsql::Connection, team_id: &str) -> Result<Team, DatabaseError> {
    load_team(conn, team_id)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityType::Team, team_id).into())
}

/// Id of the non-withdrawn team a student is on.
pub(crate) async fn active_team_of(
    conn: &libsql::Connection,
    member_id: &str,
) -> Result<Option<String>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT team_id FROM team_members WHERE member_id = ?1 AND active = 1",
            [member_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row.get::<String>(0)?)),
        None => Ok(None),
    }
}

fn already_on_team(member_id: &str) -> CoreError {
    CoreError::conflict(
        EntityType::Actor,
        member_id,
        "on_team",
        "join_team",
        "student already belongs to an active team",
    )
}

/// Insert a new `forming` team with its roster and audit entries.
pub(crate) async fn insert_team(
    conn: &libsql::Connection,
    actor_id: &str,
    member_ids: &[String],
    capacity: u32,
    now: DateTime<Utc>,
) -> Result<Team, DatabaseError> {
    Team::validate_roster(member_ids, capacity)?;
    let id = generate_id(conn, PREFIX_TEAM).await?;

    conn.execute(
        "INSERT INTO teams (id, capacity, stage, version, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?5)",
        libsql::params![
            id.as_str(),
            i64::from(capacity),
            Stage::Forming.as_str(),
            now.to_rfc3339(),
            now.to_rfc3339()
        ],
    )
    .await?;

    let mut sorted = member_ids.to_vec();
    sorted.sort();
    for member in &sorted {
        conn.execute(
            "INSERT INTO team_members (team_id, member_id, active, joined_at) VALUES (?1, ?2, 1, ?3)",
            libsql::params![id.as_str(), member.as_str(), now.to_rfc3339()],
        )
        .await
        .map_err(|e| on_unique(e, || already_on_team(member)))?;
    }

    record_audit(
        conn,
        Some(actor_id),
        EntityType::Team,
        &id,
        AuditAction::Created,
        to_detail(&serde_json::json!({ "member_ids": sorted, "capacity": capacity }))?,
        now,
    )
    .await?;

    Ok(Team {
        id,
        member_ids: sorted,
        capacity,
        mentor_id: None,
        stage: Stage::Forming,
        version: 1,
        created_at: now,
        updated_at: now,
        certified_by: None,
        certified_at: None,
        withdrawn_by: None,
        withdrawn_at: None,
        withdrawn_reason: None,
    })
}

/// Write every mutable column of `team` if the row is still at `team.version`.
///
/// Returns the team at its new version. Zero affected rows means another
/// writer committed first: a retry-safe conflict.
pub(crate) async fn save_team(
    conn: &libsql::Connection,
    team: &Team,
    action: &str,
) -> Result<Team, DatabaseError> {
    let affected = conn
        .execute(
            "UPDATE teams SET mentor_id = ?1, stage = ?2, version = version + 1, updated_at = ?3,
                 certified_by = ?4, certified_at = ?5, withdrawn_by = ?6, withdrawn_at = ?7,
                 withdrawn_reason = ?8
             WHERE id = ?9 AND version = ?10",
            libsql::params![
                team.mentor_id.as_deref(),
                team.stage.as_str(),
                team.updated_at.to_rfc3339(),
                team.certified_by.as_deref(),
                opt_rfc3339(team.certified_at),
                team.withdrawn_by.as_deref(),
                opt_rfc3339(team.withdrawn_at),
                team.withdrawn_reason.as_deref(),
                team.id.as_str(),
                team.version
            ],
        )
        .await?;

    if affected == 0 {
        return Err(CoreError::stale(EntityType::Team, &team.id, team.stage, action).into());
    }
    Ok(Team {
        version: team.version + 1,
        ..team.clone()
    })
}

/// Apply a workflow event to `team`, persist it, and audit the stage change.
///
/// `edit` adjusts other columns (certification, withdrawal markers) on the
/// same write.
pub(crate) async fn transition(
    conn: &libsql::Connection,
    team: &Team,
    event: WorkflowEvent,
    actor_id: &str,
    now: DateTime<Utc>,
    edit: impl FnOnce(&mut Team),
) -> Result<Team, DatabaseError> {
    let to = advance(team, event)?;
    let mut next = team.clone();
    next.stage = to;
    next.updated_at = now;
    edit(&mut next);
    let saved = save_team(conn, &next, event.as_str()).await?;

    let detail = StageChangedDetail {
        from: team.stage,
        to,
        event,
        version: saved.version,
    };
    record_audit(
        conn,
        Some(actor_id),
        EntityType::Team,
        &team.id,
        AuditAction::StageChanged,
        to_detail(&detail)?,
        now,
    )
    .await?;

    tracing::info!(team_id = %team.id, from = %team.stage, to = %to, event = %event, "stage transition");
    Ok(saved)
}

/// Add a student to a forming team with room.
pub(crate) async fn add_member(
    conn: &libsql::Connection,
    team: &Team,
    member_id: &str,
    actor_id: &str,
    invitation_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Team, DatabaseError> {
    if team.stage != Stage::Forming {
        return Err(CoreError::conflict(
            EntityType::Team,
            &team.id,
            team.stage,
            "add_member",
            "team has left forming",
        )
        .into());
    }
    if !team.has_room() {
        return Err(CoreError::conflict(
            EntityType::Team,
            &team.id,
            team.stage,
            "add_member",
            format!("team is full ({} of {})", team.member_ids.len(), team.capacity),
        )
        .into());
    }

    conn.execute(
        "INSERT INTO team_members (team_id, member_id, active, joined_at) VALUES (?1, ?2, 1, ?3)",
        libsql::params![team.id.as_str(), member_id, now.to_rfc3339()],
    )
    .await
    .map_err(|e| on_unique(e, || already_on_team(member_id)))?;

    let mut next = team.clone();
    next.member_ids.push(member_id.to_string());
    next.member_ids.sort();
    next.updated_at = now;
    let saved = save_team(conn, &next, "add_member").await?;

    let detail = MemberAddedDetail {
        member_id: member_id.to_string(),
        invitation_id: invitation_id.map(String::from),
    };
    record_audit(
        conn,
        Some(actor_id),
        EntityType::Team,
        &team.id,
        AuditAction::MemberAdded,
        to_detail(&detail)?,
        now,
    )
    .await?;
    Ok(saved)
}

/// Outcome of a mentor bind attempt.
pub(crate) enum MentorBinding {
    Bound(Team),
    AlreadyBound(Team),
}

/// Set `mentor_id` if unset. Same mentor again is a no-op.
pub(crate) async fn bind_mentor_row(
    conn: &libsql::Connection,
    team: &Team,
    mentor_id: &str,
    actor_id: &str,
    invitation_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<MentorBinding, DatabaseError> {
    match team.mentor_id.as_deref() {
        Some(bound) if bound == mentor_id => return Ok(MentorBinding::AlreadyBound(team.clone())),
        Some(bound) => {
            return Err(CoreError::conflict(
                EntityType::Team,
                &team.id,
                team.stage,
                "bind_mentor",
                format!("mentor {bound} is already bound"),
            )
            .into());
        }
        None => {}
    }
    if team.stage.is_terminal() {
        return Err(terminal_conflict(team, "bind_mentor").into());
    }

    let mut next = team.clone();
    next.mentor_id = Some(mentor_id.to_string());
    next.updated_at = now;
    let saved = save_team(conn, &next, "bind_mentor").await?;

    let detail = MentorBoundDetail {
        mentor_id: mentor_id.to_string(),
        invitation_id: invitation_id.map(String::from),
    };
    record_audit(
        conn,
        Some(actor_id),
        EntityType::Team,
        &team.id,
        AuditAction::MentorBound,
        to_detail(&detail)?,
        now,
    )
    .await?;

    tracing::info!(team_id = %team.id, mentor_id, "mentor bound");
    Ok(MentorBinding::Bound(saved))
}

pub(crate) fn terminal_conflict(team: &Team, action: &str) -> CoreError {
    CoreError::conflict(
        EntityType::Team,
        &team.id,
        team.stage,
        action,
        format!("team is {}", team.stage),
    )
}

async fn kind_approved(
    conn: &libsql::Connection,
    team_id: &str,
    kind: ArtifactKind,
) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM artifacts WHERE team_id = ?1 AND kind = ?2 AND status = ?3 LIMIT 1",
            libsql::params![team_id, kind.as_str(), ArtifactStatus::Approved.as_str()],
        )
        .await?;
    Ok(rows.next().await?.is_some())
}

/// Read the records the stage is derived from and recompute it.
pub(crate) async fn derived_stage(conn: &libsql::Connection, team: &Team) -> Result<Stage, DatabaseError> {
    let request_status = {
        let mut rows = conn
            .query("SELECT status FROM project_requests WHERE team_id = ?1", [team.id.as_str()])
            .await?;
        match rows.next().await? {
            Some(row) => Some(parse_enum::<RequestStatus>(&row.get::<String>(0)?)?),
            None => None,
        }
    };

    let presentation_approved = kind_approved(conn, &team.id, ArtifactKind::Presentation).await?;
    let report_approved = kind_approved(conn, &team.id, ArtifactKind::Report).await?;

    Ok(derive_stage(&StageInputs {
        team,
        request_status,
        presentation_approved,
        report_approved,
    }))
}

/// Derived stage, logging if the persisted pointer drifted from it.
pub(crate) async fn checked_stage(conn: &libsql::Connection, team: &Team) -> Result<Stage, DatabaseError> {
    let derived = derived_stage(conn, team).await?;
    if derived != team.stage {
        tracing::warn!(
            team_id = %team.id,
            persisted = %team.stage,
            derived = %derived,
            "persisted stage disagrees with its inputs"
        );
    }
    Ok(derived)
}

impl CapstoneService {
    /// Bootstrap a team without invitations.
    ///
    /// Admins may declare any roster; a student may declare a solo team of
    /// themself. The team's capacity is the declared roster size.
    ///
    /// # Errors
    ///
    /// `Forbidden` for other actors or rosters, `NotFound` for unknown
    /// members, `Validation` for malformed rosters or non-student members,
    /// `Conflict` if a member is already on an active team.
    #[tracing::instrument(skip(self, member_ids))]
    pub async fn declare_team(&self, actor_id: &str, member_ids: &[String]) -> Result<Team, DatabaseError> {
        let actor = self.resolve(actor_id).await?;
        match actor.role {
            Role::Admin => {}
            Role::Student if member_ids.len() == 1 && member_ids[0] == actor_id => {}
            Role::Student => {
                return Err(CoreError::forbidden(actor_id, "declare_team", "students may only declare a solo team of themself").into());
            }
            Role::Mentor => {
                return Err(CoreError::forbidden(actor_id, "declare_team", "mentors cannot declare teams").into());
            }
        }

        let capacity = u32::try_from(member_ids.len())
            .map_err(|_| CoreError::validation("member_ids", "roster too large"))?;
        Team::validate_roster(member_ids, capacity)?;
        for member_id in member_ids {
            let member = self.resolve(member_id).await?;
            if !member.is(Role::Student) {
                return Err(CoreError::validation("member_ids", format!("{member_id} is not a student")).into());
            }
        }

        let now = Utc::now();
        let tx = self.begin().await?;
        for member_id in member_ids {
            if active_team_of(&tx, member_id).await?.is_some() {
                return Err(already_on_team(member_id).into());
            }
        }
        let team = insert_team(&tx, actor_id, member_ids, capacity, now).await?;
        tx.commit().await?;

        tracing::info!(team_id = %team.id, members = team.member_ids.len(), "team declared");
        self.dispatch(vec![
            Notification::new(NotificationKind::TeamFormed, Some(actor_id))
                .to(team.audience())
                .team(&team.id, team.stage),
        ])
        .await;
        Ok(team)
    }

    /// Admin override binding a mentor directly.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor is an admin, `Validation` if `mentor_id`
    /// is not a mentor, `Conflict` if a different mentor is bound or the team
    /// is terminal.
    #[tracing::instrument(skip(self))]
    pub async fn bind_mentor(&self, team_id: &str, actor_id: &str, mentor_id: &str) -> Result<Team, DatabaseError> {
        self.require_admin(actor_id, "bind_mentor").await?;
        let mentor = self.resolve(mentor_id).await?;
        if !mentor.is(Role::Mentor) {
            return Err(CoreError::validation("mentor_id", format!("{mentor_id} is not a mentor")).into());
        }

        let (team, notes) = {
            let _sections = self.locks().acquire(None, &[team_id]).await;
            let now = Utc::now();
            let tx = self.begin().await?;
            let team = require_team(&tx, team_id).await?;
            match bind_mentor_row(&tx, &team, mentor_id, actor_id, None, now).await? {
                MentorBinding::AlreadyBound(team) => (team, Vec::new()),
                MentorBinding::Bound(team) => {
                    tx.commit().await?;
                    let note = Notification::new(NotificationKind::MentorBound, Some(actor_id))
                        .to(team.audience())
                        .team(&team.id, team.stage);
                    (team, vec![note])
                }
            }
        };
        self.dispatch(notes).await;
        Ok(team)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown team.
    pub async fn get_team(&self, team_id: &str) -> Result<Team, DatabaseError> {
        let conn = self.reader().await?;
        require_team(&conn, team_id).await
    }

    /// The active team a student is on, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn team_for_member(&self, member_id: &str) -> Result<Option<Team>, DatabaseError> {
        let conn = self.reader().await?;
        match active_team_of(&conn, member_id).await? {
            Some(team_id) => load_team(&conn, &team_id).await,
            None => Ok(None),
        }
    }

    /// Teams mentored by `mentor_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn teams_for_mentor(&self, mentor_id: &str) -> Result<Vec<Team>, DatabaseError> {
        let conn = self.reader().await?;
        let ids = {
            let mut rows = conn
                .query(
                    "SELECT id FROM teams WHERE mentor_id = ?1 ORDER BY created_at DESC",
                    [mentor_id],
                )
                .await?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next().await? {
                ids.push(row.get::<String>(0)?);
            }
            ids
        };
        let mut teams = Vec::with_capacity(ids.len());
        for id in ids {
            teams.push(require_team(&conn, &id).await?);
        }
        Ok(teams)
    }

    /// Current stage, derived from the persisted inputs.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown team.
    pub async fn current_stage(&self, team_id: &str) -> Result<Stage, DatabaseError> {
        let conn = self.reader().await?;
        let tx = conn.transaction().await?;
        let team = require_team(&tx, team_id).await?;
        let stage = checked_stage(&tx, &team).await?;
        tracing::debug!(team_id, stage = %stage, "stage read");
        Ok(stage)
    }

    /// Team, stage, live request, revision history and artifacts in one read.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown team.
    pub async fn team_overview(&self, team_id: &str) -> Result<TeamOverview, DatabaseError> {
        let conn = self.reader().await?;
        let tx = conn.transaction().await?;
        let team = require_team(&tx, team_id).await?;
        let stage = checked_stage(&tx, &team).await?;
        let request = crate::repos::request::load_request(&tx, team_id).await?;
        let revisions = crate::repos::request::load_revisions(&tx, team_id).await?;
        let artifacts = crate::repos::artifact::load_artifacts(&tx, team_id, None).await?;
        Ok(TeamOverview {
            team,
            stage,
            request,
            revisions,
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{ADMIN, MENTOR, MENTOR_2, STUDENTS, test_service};

    fn roster(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn admin_declares_any_roster() {
        let env = test_service().await;
        let team = env
            .svc
            .declare_team(ADMIN, &roster(&[STUDENTS[1], STUDENTS[0], STUDENTS[2]]))
            .await
            .unwrap();
        assert!(team.id.starts_with("tem-"));
        assert_eq!(team.capacity, 3);
        assert_eq!(team.member_ids, roster(&["alice", "bob", "carol"]));
        assert_eq!(team.stage, Stage::Forming);
        assert!(team.is_complete());
    }

    #[tokio::test]
    async fn student_may_only_declare_solo() {
        let env = test_service().await;
        let solo = env.svc.declare_team("alice", &roster(&["alice"])).await.unwrap();
        assert_eq!(solo.capacity, 1);
        assert!(solo.is_complete());

        let err = env
            .svc
            .declare_team("bob", &roster(&["bob", "carol"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[tokio::test]
    async fn declaring_a_member_twice_conflicts() {
        let env = test_service().await;
        env.svc.declare_team("alice", &roster(&["alice"])).await.unwrap();
        let err = env
            .svc
            .declare_team(ADMIN, &roster(&["alice", "bob"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
        assert!(env.svc.team_for_member("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn declare_rejects_bad_rosters() {
        let env = test_service().await;
        let dup = env.svc.declare_team(ADMIN, &roster(&["alice", "alice"])).await.unwrap_err();
        assert_eq!(dup.kind(), "validation");
        let empty = env.svc.declare_team(ADMIN, &[]).await.unwrap_err();
        assert_eq!(empty.kind(), "validation");
        let mentor = env.svc.declare_team(ADMIN, &roster(&["alice", MENTOR])).await.unwrap_err();
        assert_eq!(mentor.kind(), "validation");
        let ghost = env.svc.declare_team(ADMIN, &roster(&["alice", "ghost"])).await.unwrap_err();
        assert_eq!(ghost.kind(), "not_found");
    }

    #[tokio::test]
    async fn bind_mentor_twice_is_a_noop() {
        let env = test_service().await;
        let team = env.svc.declare_team("alice", &roster(&["alice"])).await.unwrap();

        let first = env.svc.bind_mentor(&team.id, ADMIN, MENTOR).await.unwrap();
        assert_eq!(first.mentor_id.as_deref(), Some(MENTOR));
        assert_eq!(first.version, team.version + 1);

        let second = env.svc.bind_mentor(&team.id, ADMIN, MENTOR).await.unwrap();
        assert_eq!(second, first);

        let err = env.svc.bind_mentor(&team.id, ADMIN, MENTOR_2).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
        assert_eq!(env.svc.get_team(&team.id).await.unwrap().mentor_id.as_deref(), Some(MENTOR));
    }

    #[tokio::test]
    async fn bind_mentor_requires_admin_and_mentor_role() {
        let env = test_service().await;
        let team = env.svc.declare_team("alice", &roster(&["alice"])).await.unwrap();
        let err = env.svc.bind_mentor(&team.id, "alice", MENTOR).await.unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        let err = env.svc.bind_mentor(&team.id, ADMIN, "bob").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        let err = env.svc.bind_mentor("tem-00000000", ADMIN, MENTOR).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn current_stage_matches_persisted_stage() {
        let env = test_service().await;
        let team = env.svc.declare_team("alice", &roster(&["alice"])).await.unwrap();
        assert_eq!(env.svc.current_stage(&team.id).await.unwrap(), Stage::Forming);
        let overview = env.svc.team_overview(&team.id).await.unwrap();
        assert_eq!(overview.stage, Stage::Forming);
        assert!(overview.request.is_none());
        assert!(overview.artifacts.is_empty());
    }

    #[tokio::test]
    async fn declare_writes_audit_and_notifies() {
        let mut env = test_service().await;
        let team = env.svc.declare_team(ADMIN, &roster(&["alice", "bob"])).await.unwrap();

        let entries = env
            .svc
            .query_audit(&crate::repos::audit::AuditFilter {
                entity_id: Some(team.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Created);

        let note = env.events.try_recv().unwrap();
        assert_eq!(note.kind, NotificationKind::TeamFormed);
        assert_eq!(note.recipients, roster(&["alice", "bob"]));
    }
}
