//! Audit trail repository.
//!
//! Append-only entries recording every committed mutation. Entries are
//! written on the operation's own transaction, so a rollback discards them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use capstone_core::entities::AuditEntry;
use capstone_core::enums::{AuditAction, EntityType};
use capstone_core::ids::PREFIX_AUDIT;

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::CapstoneService;

/// Filter criteria for audit queries.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

/// Serialize a typed detail payload.
pub(crate) fn to_detail<T: Serialize>(detail: &T) -> Result<Option<serde_json::Value>, DatabaseError> {
    serde_json::to_value(detail)
        .map(Some)
        .map_err(|e| DatabaseError::Other(e.into()))
}

/// Append one entry on the given connection (normally an open transaction).
pub(crate) async fn record_audit(
    conn: &libsql::Connection,
    actor_id: Option<&str>,
    entity_type: EntityType,
    entity_id: &str,
    action: AuditAction,
    detail: Option<serde_json::Value>,
    now: DateTime<Utc>,
) -> Result<AuditEntry, DatabaseError> {
    let entry = AuditEntry {
        id: generate_id(conn, PREFIX_AUDIT).await?,
        actor_id: actor_id.map(String::from),
        entity_type,
        entity_id: entity_id.to_string(),
        action,
        detail,
        created_at: now,
    };
    conn.execute(
        "INSERT INTO audit_trail (id, actor_id, entity_type, entity_id, action, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        libsql::params![
            entry.id.as_str(),
            entry.actor_id.as_deref(),
            entry.entity_type.as_str(),
            entry.entity_id.as_str(),
            entry.action.as_str(),
            entry.detail.as_ref().map(std::string::ToString::to_string).as_deref(),
            entry.created_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(entry)
}

impl CapstoneService {
    /// Query audit entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref et) = filter.entity_type {
            params.push(libsql::Value::Text(et.as_str().to_string()));
            conditions.push(format!("entity_type = ?{}", params.len()));
        }
        if let Some(ref eid) = filter.entity_id {
            params.push(libsql::Value::Text(eid.clone()));
            conditions.push(format!("entity_id = ?{}", params.len()));
        }
        if let Some(ref aid) = filter.actor_id {
            params.push(libsql::Value::Text(aid.clone()));
            conditions.push(format!("actor_id = ?{}", params.len()));
        }
        if let Some(ref action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT id, actor_id, entity_type, entity_id, action, detail, created_at
             FROM audit_trail {where_clause}
             ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
        );

        let conn = self.reader().await?;
        let mut rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next().await? {
            entries.push(AuditEntry {
                id: row.get::<String>(0)?,
                actor_id: get_opt_string(&row, 1)?,
                entity_type: parse_enum(&row.get::<String>(2)?)?,
                entity_id: row.get::<String>(3)?,
                action: parse_enum(&row.get::<String>(4)?)?,
                detail: parse_optional_json(get_opt_string(&row, 5)?.as_deref())?,
                created_at: parse_datetime(&row.get::<String>(6)?)?,
            });
        }

        Ok(entries)
    }
}
