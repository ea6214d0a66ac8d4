//! Shared test utilities for capstone-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use std::sync::Arc;

    use capstone_config::WorkflowConfig;
    use capstone_core::entities::{Actor, Notification, Team};
    use capstone_core::enums::Role;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::CapstoneDb;
    use crate::directory::{DbDirectory, IdentityDirectory, StaticDirectory};
    use crate::notify::ChannelSink;
    use crate::service::CapstoneService;

    pub const ADMIN: &str = "root";
    pub const MENTOR: &str = "mona";
    pub const MENTOR_2: &str = "milo";
    pub const STUDENTS: [&str; 4] = ["alice", "bob", "carol", "dave"];

    /// Service plus the receiving end of its notification channel. The
    /// temp dir holding the database lives as long as the env.
    pub struct TestEnv {
        pub svc: CapstoneService,
        pub events: UnboundedReceiver<Notification>,
        _dir: TempDir,
    }

    fn directory() -> StaticDirectory {
        StaticDirectory::new(STUDENTS.iter().map(|id| Actor::new(*id, Role::Student)))
            .with(Actor::new(MENTOR, Role::Mentor))
            .with(Actor::new(MENTOR_2, Role::Mentor))
            .with(Actor::new(ADMIN, Role::Admin))
    }

    async fn build(settings: WorkflowConfig, directory: Option<Arc<dyn IdentityDirectory>>) -> TestEnv {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capstone.db");
        let db = Arc::new(CapstoneDb::open_local(path.to_str().unwrap(), 5000).await.unwrap());
        let directory: Arc<dyn IdentityDirectory> = match directory {
            Some(directory) => directory,
            None => Arc::new(DbDirectory::new(Arc::clone(&db))),
        };
        let (sink, events) = ChannelSink::new();
        TestEnv {
            svc: CapstoneService::new(db, settings, directory, Arc::new(sink)),
            events,
            _dir: dir,
        }
    }

    /// Service over a fresh on-disk database with the fixed test roster.
    pub async fn test_service() -> TestEnv {
        test_service_with(|_| {}).await
    }

    /// Same as [`test_service`] with adjusted workflow settings.
    pub async fn test_service_with(adjust: impl FnOnce(&mut WorkflowConfig)) -> TestEnv {
        let mut settings = WorkflowConfig::default();
        adjust(&mut settings);
        build(settings, Some(Arc::new(directory()))).await
    }

    /// Service resolving actors through the `actors` table (initially empty).
    pub async fn db_backed_service() -> TestEnv {
        build(WorkflowConfig::default(), None).await
    }

    /// Everything published so far.
    pub fn drain(events: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = events.try_recv() {
            out.push(n);
        }
        out
    }

    /// alice + bob, mentored by [`MENTOR`], still forming.
    pub async fn mentored_team(svc: &CapstoneService) -> Team {
        let team = svc
            .declare_team(ADMIN, &[STUDENTS[0].to_string(), STUDENTS[1].to_string()])
            .await
            .unwrap();
        svc.bind_mentor(&team.id, ADMIN, MENTOR).await.unwrap()
    }

    /// [`mentored_team`] with its first request approved.
    pub async fn approved_team(svc: &CapstoneService) -> Team {
        let team = mentored_team(svc).await;
        svc.submit_project_request(&team.id, STUDENTS[0], "Campus room finder", "Live room availability.")
            .await
            .unwrap();
        svc.decide_project_request(&team.id, MENTOR, true, None)
            .await
            .unwrap();
        svc.get_team(&team.id).await.unwrap()
    }
}
