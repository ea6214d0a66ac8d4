//! Notification sink configuration.

use serde::{Deserialize, Serialize};

const fn default_log_events() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    /// JSONL file that receives every published notification. Empty disables it.
    #[serde(default)]
    pub outbox_path: String,

    /// Emit each notification as a tracing event.
    #[serde(default = "default_log_events")]
    pub log_events: bool,
}

impl NotifyConfig {
    #[must_use]
    pub fn has_outbox(&self) -> bool {
        !self.outbox_path.trim().is_empty()
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            outbox_path: String::new(),
            log_events: default_log_events(),
        }
    }
}
