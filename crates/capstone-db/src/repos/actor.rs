//! Actor registry backing `DbDirectory`.
//!
//! Actors are immutable once registered: registering an existing id is a
//! conflict, never an update.

use chrono::Utc;

use capstone_core::entities::Actor;
use capstone_core::enums::{AuditAction, EntityType, Role};
use capstone_core::errors::CoreError;
use capstone_core::validation::validate_actor_id;

use crate::error::{DatabaseError, on_unique};
use crate::helpers::{get_opt_string, parse_enum};
use crate::repos::audit::{record_audit, to_detail};
use crate::service::CapstoneService;

fn row_to_actor(row: &libsql::Row) -> Result<Actor, DatabaseError> {
    Ok(Actor {
        id: row.get(0)?,
        role: parse_enum(&row.get::<String>(1)?)?,
        display_name: get_opt_string(row, 2)?,
    })
}

impl CapstoneService {
    /// Add an actor to the `actors` table.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank id, `Conflict` if the id is taken.
    pub async fn register_actor(&self, actor: &Actor) -> Result<Actor, DatabaseError> {
        validate_actor_id("id", &actor.id)?;
        let now = Utc::now();
        let tx = self.begin().await?;

        tx.execute(
            "INSERT INTO actors (id, role, display_name, created_at) VALUES (?1, ?2, ?3, ?4)",
            libsql::params![
                actor.id.as_str(),
                actor.role.as_str(),
                actor.display_name.as_deref(),
                now.to_rfc3339()
            ],
        )
        .await
        .map_err(|e| {
            on_unique(e, || {
                CoreError::conflict(EntityType::Actor, &actor.id, "registered", "register", "actor id already exists")
            })
        })?;

        record_audit(
            &tx,
            None,
            EntityType::Actor,
            &actor.id,
            AuditAction::Created,
            to_detail(&serde_json::json!({ "role": actor.role }))?,
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(actor_id = %actor.id, role = %actor.role, "actor registered");
        Ok(actor.clone())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_actors(&self, role: Option<Role>) -> Result<Vec<Actor>, DatabaseError> {
        let conn = self.reader().await?;
        let mut rows = match role {
            Some(role) => {
                conn.query(
                    "SELECT id, role, display_name FROM actors WHERE role = ?1 ORDER BY id",
                    [role.as_str()],
                )
                .await?
            }
            None => {
                conn.query("SELECT id, role, display_name FROM actors ORDER BY id", ())
                    .await?
            }
        };

        let mut actors = Vec::new();
        while let Some(row) = rows.next().await? {
            actors.push(row_to_actor(&row)?);
        }
        Ok(actors)
    }
}
