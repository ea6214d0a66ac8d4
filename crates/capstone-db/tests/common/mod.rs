//! Fixtures shared by the capstone-db integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use capstone_config::WorkflowConfig;
use capstone_core::entities::{Actor, Notification};
use capstone_core::enums::Role;
use capstone_db::CapstoneDb;
use capstone_db::directory::StaticDirectory;
use capstone_db::notify::ChannelSink;
use capstone_db::service::CapstoneService;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub const ADMIN: &str = "root";
pub const MENTOR: &str = "mona";

pub struct Env {
    pub svc: CapstoneService,
    pub events: UnboundedReceiver<Notification>,
    _dir: TempDir,
}

impl Env {
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.events.try_recv() {
            out.push(n);
        }
        out
    }
}

pub async fn env() -> Env {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capstone.db");
    let db = Arc::new(CapstoneDb::open_local(path.to_str().unwrap(), 5000).await.unwrap());

    let directory = StaticDirectory::new(
        ["alice", "bob", "carol", "dave", "erin"]
            .into_iter()
            .map(|id| Actor::new(id, Role::Student)),
    )
    .with(Actor::new(MENTOR, Role::Mentor))
    .with(Actor::new(ADMIN, Role::Admin));

    let (sink, events) = ChannelSink::new();
    Env {
        svc: CapstoneService::new(db, WorkflowConfig::default(), Arc::new(directory), Arc::new(sink)),
        events,
        _dir: dir,
    }
}

pub fn names(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| (*s).to_string()).collect()
}
