//! Service layer orchestrating workflow operations.
//!
//! `CapstoneService` wraps `CapstoneDb` (raw database access), the lock table,
//! the identity directory and the notification sink. The operations live in
//! `impl CapstoneService` blocks under [`crate::repos`].
//!
//! Every mutating operation follows this protocol:
//! 1. Validate input and resolve actors through the directory
//! 2. Take the pair and team sections
//! 3. Begin an immediate transaction on a fresh connection
//! 4. Re-read state, check rules, write rows and audit entries
//! 5. Commit, release the sections
//! 6. Publish notifications

use std::sync::Arc;

use capstone_config::{CapstoneConfig, WorkflowConfig};
use capstone_core::entities::{Actor, Notification};
use capstone_core::enums::{EntityType, Role};
use capstone_core::errors::CoreError;
use chrono::Duration;
use libsql::{Transaction, TransactionBehavior};

use crate::CapstoneDb;
use crate::directory::{DbDirectory, IdentityDirectory};
use crate::error::DatabaseError;
use crate::locks::KeyedLocks;
use crate::notify::{NotificationSink, sink_from_config};

/// Cheap to clone: all state is shared.
#[derive(Clone)]
pub struct CapstoneService {
    db: Arc<CapstoneDb>,
    settings: WorkflowConfig,
    locks: KeyedLocks,
    directory: Arc<dyn IdentityDirectory>,
    sink: Arc<dyn NotificationSink>,
}

impl CapstoneService {
    #[must_use]
    pub fn new(
        db: Arc<CapstoneDb>,
        settings: WorkflowConfig,
        directory: Arc<dyn IdentityDirectory>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            db,
            settings,
            locks: KeyedLocks::new(),
            directory,
            sink,
        }
    }

    /// Open the configured database with the actors table as directory and
    /// the configured sink stack.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open(config: &CapstoneConfig) -> Result<Self, DatabaseError> {
        let db = Arc::new(
            CapstoneDb::open_local(&config.database.path, config.database.busy_timeout_ms).await?,
        );
        let directory = Arc::new(DbDirectory::new(Arc::clone(&db)));
        Ok(Self::new(
            db,
            config.workflow.clone(),
            directory,
            sink_from_config(&config.notify),
        ))
    }

    #[must_use]
    pub fn db(&self) -> &CapstoneDb {
        &self.db
    }

    #[must_use]
    pub const fn settings(&self) -> &WorkflowConfig {
        &self.settings
    }

    #[must_use]
    pub const fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Pending invitations older than this are stale.
    #[must_use]
    pub fn invitation_ttl(&self) -> Duration {
        i64::try_from(self.settings.invitation_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Begin an immediate (write-locking) transaction on a fresh connection.
    ///
    /// Dropping the returned transaction without commit rolls it back.
    pub(crate) async fn begin(&self) -> Result<Transaction, DatabaseError> {
        let conn = self.db.connect().await?;
        Ok(conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?)
    }

    /// Fresh connection for read-only operations.
    pub(crate) async fn reader(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().await
    }

    /// Resolve an actor or fail with `NotFound`.
    pub(crate) async fn resolve(&self, actor_id: &str) -> Result<Actor, DatabaseError> {
        self.directory
            .resolve(actor_id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityType::Actor, actor_id).into())
    }

    /// Resolve an actor and require an admin.
    pub(crate) async fn require_admin(
        &self,
        actor_id: &str,
        action: &str,
    ) -> Result<Actor, DatabaseError> {
        let actor = self.resolve(actor_id).await?;
        if actor.is(Role::Admin) {
            Ok(actor)
        } else {
            Err(CoreError::forbidden(actor_id, action, "admin role required").into())
        }
    }

    /// Publish committed notifications. Failures are logged and dropped.
    pub(crate) async fn dispatch(&self, notifications: Vec<Notification>) {
        for n in notifications {
            if let Err(e) = self.sink.publish(&n).await {
                tracing::warn!(kind = %n.kind, error = %e, "notification sink failed");
            }
        }
    }
}
