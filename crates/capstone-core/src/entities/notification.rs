use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{NotificationKind, Stage};

/// Event handed to the notification sink after a transition commits.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub actor_id: Option<String>,
    pub recipients: Vec<String>,
    pub team_id: Option<String>,
    pub invitation_id: Option<String>,
    pub artifact_id: Option<String>,
    pub stage: Option<Stage>,
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, actor_id: Option<&str>) -> Self {
        Self {
            kind,
            actor_id: actor_id.map(String::from),
            recipients: Vec::new(),
            team_id: None,
            invitation_id: None,
            artifact_id: None,
            stage: None,
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn to<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients.extend(recipients.into_iter().map(Into::into));
        self.recipients.sort();
        self.recipients.dedup();
        self
    }

    #[must_use]
    pub fn team(mut self, team_id: &str, stage: Stage) -> Self {
        self.team_id = Some(team_id.to_string());
        self.stage = Some(stage);
        self
    }

    #[must_use]
    pub fn invitation(mut self, invitation_id: &str) -> Self {
        self.invitation_id = Some(invitation_id.to_string());
        self
    }

    #[must_use]
    pub fn artifact(mut self, artifact_id: &str) -> Self {
        self.artifact_id = Some(artifact_id.to_string());
        self
    }
}
