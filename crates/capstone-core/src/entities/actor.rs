use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Role;

/// An identity resolved by the identity directory. Immutable once issued.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}
