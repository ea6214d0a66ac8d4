//! Schema setup, run on every open.
//!
//! Statements are `IF NOT EXISTS`, so re-running against an existing file is
//! a no-op.

use crate::error::DatabaseError;

/// Actors, invitations, teams with their rosters, project requests with
/// revisions, artifacts and the audit trail. Partial unique indexes back the
/// one-pending-invitation, one-submitted-artifact and one-active-team rules.
const SCHEMA_V1: &str = include_str!("../migrations/001_initial.sql");

pub(crate) async fn run_migrations(conn: &libsql::Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA_V1)
        .await
        .map_err(|e| DatabaseError::Migration(format!("001_initial: {e}")))?;
    tracing::debug!("schema v1 applied");
    Ok(())
}
