//! Identity directory: who an actor is and what role they hold.
//!
//! The workflow only ever asks one question of it, [`IdentityDirectory::resolve`].
//! Two implementations ship: [`StaticDirectory`] for tests and embedding, and
//! [`DbDirectory`] over the `actors` table for the CLI.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use capstone_core::entities::Actor;

use crate::CapstoneDb;
use crate::helpers::{get_opt_string, parse_enum};

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Look up an actor. `Ok(None)` means the id is unknown.
    async fn resolve(&self, actor_id: &str) -> Result<Option<Actor>>;
}

/// Fixed set of actors held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    actors: HashMap<String, Actor>,
}

impl StaticDirectory {
    pub fn new(actors: impl IntoIterator<Item = Actor>) -> Self {
        Self {
            actors: actors.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    #[must_use]
    pub fn with(mut self, actor: Actor) -> Self {
        self.actors.insert(actor.id.clone(), actor);
        self
    }
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn resolve(&self, actor_id: &str) -> Result<Option<Actor>> {
        Ok(self.actors.get(actor_id).cloned())
    }
}

/// Directory backed by the `actors` table (see `CapstoneService::register_actor`).
pub struct DbDirectory {
    db: Arc<CapstoneDb>,
}

impl DbDirectory {
    #[must_use]
    pub const fn new(db: Arc<CapstoneDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityDirectory for DbDirectory {
    async fn resolve(&self, actor_id: &str) -> Result<Option<Actor>> {
        let conn = self.db.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, role, display_name FROM actors WHERE id = ?1",
                [actor_id],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(Actor {
            id: row.get(0)?,
            role: parse_enum(&row.get::<String>(1)?)?,
            display_name: get_opt_string(&row, 2)?,
        }))
    }
}
