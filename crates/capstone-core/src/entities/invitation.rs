use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{InvitationKind, InvitationStatus};

/// A pairing offer awaiting the recipient's answer.
///
/// `team_id` is empty for a pending teammate invitation and is filled in when
/// the acceptance creates or augments a team. Mentor invitations carry the
/// sender's team from the start.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Invitation {
    pub id: String,
    pub kind: InvitationKind,
    pub sender_id: String,
    pub recipient_id: String,
    pub team_id: Option<String>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Pending for at least `ttl` as of `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.status == InvitationStatus::Pending
            && self
                .created_at
                .checked_add_signed(ttl)
                .is_some_and(|deadline| deadline <= now)
    }

    /// The two actors the invitation pairs, regardless of direction.
    #[must_use]
    pub fn parties(&self) -> (&str, &str) {
        (self.sender_id.as_str(), self.recipient_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(created_at: DateTime<Utc>) -> Invitation {
        Invitation {
            id: "inv-00000001".into(),
            kind: InvitationKind::Teammate,
            sender_id: "alice".into(),
            recipient_id: "bob".into(),
            team_id: None,
            status: InvitationStatus::Pending,
            created_at,
            resolved_at: None,
        }
    }

    #[test]
    fn stale_after_ttl_elapses() {
        let created = Utc::now();
        let inv = pending(created);
        let ttl = Duration::hours(1);
        assert!(!inv.is_stale(created + Duration::minutes(59), ttl));
        assert!(inv.is_stale(created + Duration::hours(1), ttl));
    }

    #[test]
    fn resolved_invitation_is_never_stale() {
        let created = Utc::now() - Duration::days(30);
        let mut inv = pending(created);
        inv.status = InvitationStatus::Accepted;
        assert!(!inv.is_stale(Utc::now(), Duration::hours(1)));
    }
}
