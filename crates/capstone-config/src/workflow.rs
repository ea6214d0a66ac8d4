//! Workflow policy knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const fn default_team_capacity() -> u32 {
    2
}

/// Seven days.
const fn default_invitation_ttl_secs() -> u64 {
    604_800
}

const fn default_sweep_interval_secs() -> u64 {
    300
}

const fn default_title_max_chars() -> usize {
    200
}

const fn default_abstract_max_chars() -> usize {
    5000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Roster size of teams formed through teammate invitations.
    #[serde(default = "default_team_capacity")]
    pub team_capacity: u32,

    /// Pending invitations older than this are expired by the sweeper.
    #[serde(default = "default_invitation_ttl_secs")]
    pub invitation_ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    #[serde(default = "default_abstract_max_chars")]
    pub abstract_max_chars: usize,
}

impl WorkflowConfig {
    #[must_use]
    pub const fn invitation_ttl(&self) -> Duration {
        Duration::from_secs(self.invitation_ttl_secs)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            team_capacity: default_team_capacity(),
            invitation_ttl_secs: default_invitation_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            title_max_chars: default_title_max_chars(),
            abstract_max_chars: default_abstract_max_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = WorkflowConfig::default();
        assert_eq!(config.team_capacity, 2);
        assert_eq!(config.invitation_ttl(), Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.title_max_chars, 200);
        assert_eq!(config.abstract_max_chars, 5000);
    }
}
