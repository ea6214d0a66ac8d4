//! CLI response types returned as JSON by `capstone` commands.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Invitation, Team};
use crate::enums::Stage;

/// Response from `capstone team stage`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StageResponse {
    pub team_id: String,
    pub stage: Stage,
}

/// Response from `capstone sweep`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SweepResponse {
    pub expired: Vec<Invitation>,
    pub count: u32,
}

/// Response from `capstone invite accept|reject`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RespondResponse {
    pub invitation: Invitation,
    /// Team created, augmented, or bound by an acceptance.
    pub team: Option<Team>,
}

/// Response from `capstone init`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct InitResponse {
    pub database: String,
    pub created: bool,
}
