//! Invitation ledger: send, respond, expire, list.
//!
//! Every write runs under the pair section of the two parties, so `respond`
//! and the expiry sweep for the same pair are serialized. Accepting a teammate
//! invitation also takes the section of each team involved.

use chrono::{DateTime, Utc};

use capstone_core::audit_detail::StatusChangedDetail;
use capstone_core::entities::{Invitation, Notification, Team};
use capstone_core::enums::{
    AuditAction, EntityType, InvitationKind, InvitationStatus, NotificationKind, Role, Stage,
};
use capstone_core::errors::CoreError;
use capstone_core::ids::PREFIX_INVITATION;

use crate::error::{DatabaseError, on_unique};
use crate::helpers::{generate_id, get_opt_datetime, get_opt_string, parse_datetime, parse_enum};
use crate::repos::audit::{record_audit, to_detail};
use crate::repos::team::{
    MentorBinding, active_team_of, add_member, bind_mentor_row, insert_team, require_team,
    terminal_conflict,
};
use crate::service::CapstoneService;

const SELECT_COLS: &str =
    "id, kind, sender_id, recipient_id, team_id, status, created_at, resolved_at";

fn row_to_invitation(row: &libsql::Row) -> Result<Invitation, DatabaseError> {
    Ok(Invitation {
        id: row.get(0)?,
        kind: parse_enum(&row.get::<String>(1)?)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        team_id: get_opt_string(row, 4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        resolved_at: get_opt_datetime(row, 7)?,
    })
}

/// Filter criteria for invitation listings.
#[derive(Debug, Default)]
pub struct InvitationFilter {
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
    pub kind: Option<InvitationKind>,
    pub status: Option<InvitationStatus>,
    pub team_id: Option<String>,
    pub limit: Option<u32>,
}

pub(crate) async fn load_invitation(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Invitation>, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM invitations WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_invitation(&row)?)),
        None => Ok(None),
    }
}

async fn pending_between(
    conn: &libsql::Connection,
    kind: InvitationKind,
    sender_id: &str,
    recipient_id: &str,
) -> Result<Option<Invitation>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM invitations
                 WHERE kind = ?1 AND sender_id = ?2 AND recipient_id = ?3 AND status = 'pending'"
            ),
            libsql::params![kind.as_str(), sender_id, recipient_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_invitation(&row)?)),
        None => Ok(None),
    }
}

/// Ids of pending invitations naming a certified or withdrawn team.
async fn pending_for_closed_teams(conn: &libsql::Connection) -> Result<Vec<String>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT i.id FROM invitations i JOIN teams t ON t.id = i.team_id
             WHERE i.status = 'pending' AND t.stage IN (?1, ?2)",
            libsql::params![Stage::Certified.as_str(), Stage::Withdrawn.as_str()],
        )
        .await?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next().await? {
        ids.push(row.get::<String>(0)?);
    }
    Ok(ids)
}

async fn names_closed_team(conn: &libsql::Connection, inv: &Invitation) -> Result<bool, DatabaseError> {
    match inv.team_id.as_deref() {
        Some(team_id) => Ok(require_team(conn, team_id).await?.stage.is_terminal()),
        None => Ok(false),
    }
}

/// Team sections an acceptance of `inv` has to hold.
async fn teams_in_play(conn: &libsql::Connection, inv: &Invitation) -> Result<Vec<String>, DatabaseError> {
    match inv.kind {
        InvitationKind::Teammate => {
            let mut teams = Vec::new();
            teams.extend(active_team_of(conn, &inv.sender_id).await?);
            teams.extend(active_team_of(conn, &inv.recipient_id).await?);
            Ok(teams)
        }
        InvitationKind::Mentor => Ok(inv.team_id.iter().cloned().collect()),
    }
}

/// Move a pending invitation to a terminal status, re-checking `pending` in
/// the UPDATE itself.
async fn resolve_row(
    conn: &libsql::Connection,
    inv: &Invitation,
    status: InvitationStatus,
    team_id: Option<&str>,
    actor_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Invitation, DatabaseError> {
    let affected = conn
        .execute(
            "UPDATE invitations SET status = ?1, resolved_at = ?2, team_id = COALESCE(?3, team_id)
             WHERE id = ?4 AND status = 'pending'",
            libsql::params![status.as_str(), now.to_rfc3339(), team_id, inv.id.as_str()],
        )
        .await?;
    if affected == 0 {
        return Err(CoreError::stale(EntityType::Invitation, &inv.id, inv.status, status.as_str()).into());
    }

    let detail = StatusChangedDetail {
        from: inv.status.as_str().to_string(),
        to: status.as_str().to_string(),
        reason: None,
    };
    let action = if status == InvitationStatus::Expired {
        AuditAction::Expired
    } else {
        AuditAction::StatusChanged
    };
    record_audit(conn, actor_id, EntityType::Invitation, &inv.id, action, to_detail(&detail)?, now).await?;

    Ok(Invitation {
        status,
        resolved_at: Some(now),
        team_id: team_id.map(String::from).or_else(|| inv.team_id.clone()),
        ..inv.clone()
    })
}

fn roster_moved(actor_id: &str, action: &str) -> CoreError {
    CoreError::stale(EntityType::Actor, actor_id, "roster_changed", action)
}

/// What a teammate acceptance did to the roster.
enum RosterEffect {
    Created,
    Joined,
    Unchanged,
}

/// Create or augment the team for an accepted teammate invitation.
///
/// `locked` are the team sections held by the caller; finding the parties on
/// any other team means a concurrent writer moved them.
async fn place_teammates(
    conn: &libsql::Connection,
    inv: &Invitation,
    locked: &[String],
    capacity: u32,
    now: DateTime<Utc>,
) -> Result<(Team, RosterEffect), DatabaseError> {
    let sender_team = active_team_of(conn, &inv.sender_id).await?;
    let recipient_team = active_team_of(conn, &inv.recipient_id).await?;
    for team_id in sender_team.iter().chain(recipient_team.iter()) {
        if !locked.contains(team_id) {
            return Err(roster_moved(&inv.recipient_id, "accept_invitation").into());
        }
    }

    let actor = inv.recipient_id.as_str();
    match (sender_team, recipient_team) {
        (Some(a), Some(b)) if a == b => Ok((require_team(conn, &a).await?, RosterEffect::Unchanged)),
        (Some(_), Some(_)) => Err(CoreError::conflict(
            EntityType::Invitation,
            &inv.id,
            inv.status,
            "accept_invitation",
            "sender and recipient are on different teams",
        )
        .into()),
        (Some(team_id), None) => {
            let team = require_team(conn, &team_id).await?;
            let team = add_member(conn, &team, &inv.recipient_id, actor, Some(&inv.id), now).await?;
            Ok((team, RosterEffect::Joined))
        }
        (None, Some(team_id)) => {
            let team = require_team(conn, &team_id).await?;
            let team = add_member(conn, &team, &inv.sender_id, actor, Some(&inv.id), now).await?;
            Ok((team, RosterEffect::Joined))
        }
        (None, None) => {
            let members = [inv.sender_id.clone(), inv.recipient_id.clone()];
            let team = insert_team(conn, actor, &members, capacity, now).await?;
            Ok((team, RosterEffect::Created))
        }
    }
}

fn expired_note(inv: &Invitation) -> Notification {
    Notification::new(NotificationKind::InvitationExpired, None)
        .to([inv.sender_id.as_str(), inv.recipient_id.as_str()])
        .invitation(&inv.id)
}

impl CapstoneService {
    /// Offer a pairing: student to student, or a team member to a mentor.
    ///
    /// # Errors
    ///
    /// `Validation` for self-invites or wrong roles, `NotFound` for unknown
    /// actors, `Conflict` for a duplicate pending invitation or a team that
    /// cannot take the invitee.
    #[tracing::instrument(skip(self))]
    pub async fn send_invitation(
        &self,
        kind: InvitationKind,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<Invitation, DatabaseError> {
        if sender_id == recipient_id {
            return Err(CoreError::validation("recipient_id", "cannot invite yourself").into());
        }
        let sender = self.resolve(sender_id).await?;
        let recipient = self.resolve(recipient_id).await?;
        if !sender.is(Role::Student) {
            return Err(CoreError::validation("sender_id", format!("{kind} invitations are sent by students")).into());
        }
        let wanted = kind.recipient_role();
        if !recipient.is(wanted) {
            return Err(CoreError::validation("recipient_id", format!("{kind} invitations go to a {wanted}")).into());
        }

        let seen_team = {
            let conn = self.reader().await?;
            active_team_of(&conn, sender_id).await?
        };
        if kind == InvitationKind::Mentor && seen_team.is_none() {
            return Err(CoreError::validation(
                "sender_id",
                "mentor invitations are sent by a member of an active team",
            )
            .into());
        }

        let (invitation, released) = {
            let _sections = self
                .locks()
                .acquire(Some((sender_id, recipient_id)), seen_team.as_slice())
                .await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let team_id = active_team_of(&tx, sender_id).await?;
            if team_id != seen_team {
                return Err(roster_moved(sender_id, "send_invitation").into());
            }
            let team = match &team_id {
                Some(id) => Some(require_team(&tx, id).await?),
                None => None,
            };

            match (kind, &team) {
                (_, Some(team)) if team.stage.is_terminal() => {
                    return Err(terminal_conflict(team, "send_invitation").into());
                }
                (InvitationKind::Teammate, Some(team)) => {
                    let reason = if team.is_member(recipient_id) {
                        Some("recipient is already on this team".to_string())
                    } else if team.stage != Stage::Forming {
                        Some("team has left forming".to_string())
                    } else if !team.has_room() {
                        Some(format!("team is full ({} of {})", team.member_ids.len(), team.capacity))
                    } else {
                        None
                    };
                    if let Some(reason) = reason {
                        return Err(CoreError::conflict(EntityType::Team, &team.id, team.stage, "send_invitation", reason).into());
                    }
                }
                (InvitationKind::Mentor, Some(team)) => {
                    if let Some(bound) = &team.mentor_id {
                        return Err(CoreError::conflict(
                            EntityType::Team,
                            &team.id,
                            team.stage,
                            "send_invitation",
                            format!("mentor {bound} is already bound"),
                        )
                        .into());
                    }
                }
                (InvitationKind::Teammate, None) => {}
                (InvitationKind::Mentor, None) => {
                    return Err(roster_moved(sender_id, "send_invitation").into());
                }
            }

            let duplicate = || {
                CoreError::conflict(
                    EntityType::Invitation,
                    format!("{sender_id}->{recipient_id}"),
                    InvitationStatus::Pending,
                    "send_invitation",
                    format!("a pending {kind} invitation already exists"),
                )
            };
            // An offer made for a team the sender has since left is released.
            let mut released = None;
            if let Some(existing) = pending_between(&tx, kind, sender_id, recipient_id).await? {
                if kind == InvitationKind::Mentor && existing.team_id != team_id {
                    let inv = resolve_row(&tx, &existing, InvitationStatus::Expired, None, Some(sender_id), now).await?;
                    released = Some(inv);
                } else {
                    return Err(duplicate().into());
                }
            }

            let invitation = Invitation {
                id: generate_id(&tx, PREFIX_INVITATION).await?,
                kind,
                sender_id: sender_id.to_string(),
                recipient_id: recipient_id.to_string(),
                team_id: match kind {
                    InvitationKind::Mentor => team_id,
                    InvitationKind::Teammate => None,
                },
                status: InvitationStatus::Pending,
                created_at: now,
                resolved_at: None,
            };
            tx.execute(
                &format!("INSERT INTO invitations ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)"),
                libsql::params![
                    invitation.id.as_str(),
                    kind.as_str(),
                    sender_id,
                    recipient_id,
                    invitation.team_id.as_deref(),
                    InvitationStatus::Pending.as_str(),
                    now.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| on_unique(e, duplicate))?;

            record_audit(&tx, Some(sender_id), EntityType::Invitation, &invitation.id, AuditAction::Created, None, now).await?;
            tx.commit().await?;
            (invitation, released)
        };

        tracing::info!(invitation_id = %invitation.id, kind = %kind, "invitation sent");
        let mut notes = Vec::with_capacity(2);
        if let Some(old) = released {
            tracing::info!(invitation_id = %old.id, "superseded mentor invitation expired");
            notes.push(expired_note(&old));
        }
        let mut note = Notification::new(NotificationKind::InvitationSent, Some(sender_id))
            .to([recipient_id])
            .invitation(&invitation.id);
        note.team_id.clone_from(&invitation.team_id);
        notes.push(note);
        self.dispatch(notes).await;
        Ok(invitation)
    }

    /// Accept or reject a pending invitation as its recipient.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Forbidden` unless `actor_id` is the
    /// recipient, `Conflict` if the invitation is resolved or past its TTL,
    /// or the acceptance cannot be applied to the teams involved.
    #[tracing::instrument(skip(self))]
    pub async fn respond_invitation(
        &self,
        invitation_id: &str,
        actor_id: &str,
        accept: bool,
    ) -> Result<Invitation, DatabaseError> {
        let action = if accept { "accept_invitation" } else { "reject_invitation" };
        let not_found = || CoreError::not_found(EntityType::Invitation, invitation_id);

        let seen = {
            let conn = self.reader().await?;
            load_invitation(&conn, invitation_id).await?.ok_or_else(not_found)?
        };
        if seen.recipient_id != actor_id {
            return Err(CoreError::forbidden(actor_id, action, "only the recipient may respond").into());
        }

        let (invitation, notes) = {
            let _pair = self.locks().acquire(Some(seen.parties()), &[] as &[&str]).await;
            // Rosters are read under the pair section so a reciprocal accept
            // that commits first is seen here.
            let seen_teams = if accept {
                let conn = self.reader().await?;
                teams_in_play(&conn, &seen).await?
            } else {
                Vec::new()
            };
            let _teams = self.locks().acquire(None, seen_teams.as_slice()).await;
            let now = Utc::now();
            let tx = self.begin().await?;

            let current = load_invitation(&tx, invitation_id).await?.ok_or_else(not_found)?;
            if current.status != InvitationStatus::Pending {
                return Err(CoreError::conflict(
                    EntityType::Invitation,
                    invitation_id,
                    current.status,
                    action,
                    format!("invitation is already {}", current.status),
                )
                .into());
            }
            if current.is_stale(now, self.invitation_ttl()) {
                return Err(CoreError::conflict(
                    EntityType::Invitation,
                    invitation_id,
                    current.status,
                    action,
                    "invitation has expired",
                )
                .into());
            }

            let accepted = |inv: &Invitation| {
                Notification::new(NotificationKind::InvitationAccepted, Some(actor_id))
                    .to([inv.sender_id.as_str(), inv.recipient_id.as_str()])
                    .invitation(&inv.id)
            };

            if !accept {
                let inv = resolve_row(&tx, &current, InvitationStatus::Rejected, None, Some(actor_id), now).await?;
                tx.commit().await?;
                let note = Notification::new(NotificationKind::InvitationRejected, Some(actor_id))
                    .to([inv.sender_id.as_str()])
                    .invitation(&inv.id);
                (inv, vec![note])
            } else if current.kind == InvitationKind::Teammate {
                let (team, effect) =
                    place_teammates(&tx, &current, &seen_teams, self.settings().team_capacity, now).await?;
                let inv = resolve_row(&tx, &current, InvitationStatus::Accepted, Some(&team.id), Some(actor_id), now).await?;
                tx.commit().await?;

                let mut notes = vec![accepted(&inv).team(&team.id, team.stage)];
                match effect {
                    RosterEffect::Created | RosterEffect::Joined => notes.push(
                        Notification::new(NotificationKind::TeamFormed, Some(actor_id))
                            .to(team.audience())
                            .team(&team.id, team.stage),
                    ),
                    RosterEffect::Unchanged => {}
                }
                (inv, notes)
            } else {
                let team_id = current.team_id.clone().ok_or_else(|| {
                    DatabaseError::InvalidState(format!("mentor invitation {invitation_id} has no team"))
                })?;
                let team = require_team(&tx, &team_id).await?;
                if team.stage.is_terminal() {
                    return Err(terminal_conflict(&team, action).into());
                }
                let binding = bind_mentor_row(&tx, &team, actor_id, actor_id, Some(invitation_id), now).await?;
                let inv = resolve_row(&tx, &current, InvitationStatus::Accepted, None, Some(actor_id), now).await?;
                tx.commit().await?;

                let mut notes = vec![accepted(&inv).team(&team.id, team.stage)];
                if let MentorBinding::Bound(team) = binding {
                    notes.push(
                        Notification::new(NotificationKind::MentorBound, Some(actor_id))
                            .to(team.audience())
                            .team(&team.id, team.stage),
                    );
                }
                (inv, notes)
            }
        };

        tracing::info!(invitation_id, status = %invitation.status, "invitation resolved");
        self.dispatch(notes).await;
        Ok(invitation)
    }

    /// Expire every pending invitation whose TTL has elapsed as of `now`,
    /// and every pending invitation naming a certified or withdrawn team.
    ///
    /// Each expiry takes the pair section and re-checks the status in its own
    /// transaction, so an acceptance that commits first wins. Running it again
    /// with the same `now` expires nothing.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails; expiries committed before
    /// the failure stay committed.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_expired_invitations(&self, now: DateTime<Utc>) -> Result<Vec<Invitation>, DatabaseError> {
        let ttl = self.invitation_ttl();
        let closed = {
            let conn = self.reader().await?;
            pending_for_closed_teams(&conn).await?
        };
        let candidates: Vec<Invitation> = self
            .list_invitations(&InvitationFilter {
                status: Some(InvitationStatus::Pending),
                limit: Some(u32::MAX),
                ..Default::default()
            })
            .await?
            .into_iter()
            .filter(|inv| inv.is_stale(now, ttl) || closed.contains(&inv.id))
            .collect();

        let mut expired = Vec::new();
        for candidate in candidates {
            let outcome = {
                let _section = self
                    .locks()
                    .acquire(Some(candidate.parties()), &[] as &[&str])
                    .await;
                let tx = self.begin().await?;
                match load_invitation(&tx, &candidate.id).await? {
                    Some(current) if current.status == InvitationStatus::Pending => {
                        if current.is_stale(now, ttl) || names_closed_team(&tx, &current).await? {
                            let inv = resolve_row(&tx, &current, InvitationStatus::Expired, None, None, now).await?;
                            tx.commit().await?;
                            Some(inv)
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            };

            if let Some(inv) = outcome {
                self.dispatch(vec![expired_note(&inv)]).await;
                expired.push(inv);
            }
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired stale invitations");
        }
        Ok(expired)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn get_invitation(&self, invitation_id: &str) -> Result<Invitation, DatabaseError> {
        let conn = self.reader().await?;
        load_invitation(&conn, invitation_id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityType::Invitation, invitation_id).into())
    }

    /// Invitations matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_invitations(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref sender) = filter.sender_id {
            params.push(libsql::Value::Text(sender.clone()));
            conditions.push(format!("sender_id = ?{}", params.len()));
        }
        if let Some(ref recipient) = filter.recipient_id {
            params.push(libsql::Value::Text(recipient.clone()));
            conditions.push(format!("recipient_id = ?{}", params.len()));
        }
        if let Some(kind) = filter.kind {
            params.push(libsql::Value::Text(kind.as_str().to_string()));
            conditions.push(format!("kind = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            params.push(libsql::Value::Text(status.as_str().to_string()));
            conditions.push(format!("status = ?{}", params.len()));
        }
        if let Some(ref team) = filter.team_id {
            params.push(libsql::Value::Text(team.clone()));
            conditions.push(format!("team_id = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM invitations {where_clause}
             ORDER BY created_at, rowid LIMIT {limit}"
        );

        let conn = self.reader().await?;
        let mut rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
        let mut invitations = Vec::new();
        while let Some(row) = rows.next().await? {
            invitations.push(row_to_invitation(&row)?);
        }
        Ok(invitations)
    }
}
