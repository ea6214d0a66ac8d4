//! Notification sinks.
//!
//! The service publishes after commit and after its sections are released.
//! A sink failure is logged and never affects the committed transition.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use capstone_config::NotifyConfig;
use capstone_core::entities::Notification;
use tokio::sync::mpsc;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<()>;
}

/// Emits each notification as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn publish(&self, n: &Notification) -> Result<()> {
        tracing::info!(
            kind = %n.kind,
            actor = n.actor_id.as_deref().unwrap_or("-"),
            team = n.team_id.as_deref().unwrap_or("-"),
            recipients = n.recipients.len(),
            "notification"
        );
        Ok(())
    }
}

/// Appends notifications to a JSONL outbox file for an external deliverer.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl NotificationSink for JsonlSink {
    async fn publish(&self, n: &Notification) -> Result<()> {
        let path = self.path.clone();
        let n = n.clone();
        tokio::task::spawn_blocking(move || serde_jsonlines::append_json_lines(&path, [&n]))
            .await
            .context("outbox writer task failed")?
            .with_context(|| format!("failed to append to {}", self.path.display()))
    }
}

/// Forwards notifications to an in-process subscriber.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn publish(&self, n: &Notification) -> Result<()> {
        self.tx
            .send(n.clone())
            .map_err(|_| anyhow::anyhow!("notification subscriber dropped"))
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn publish(&self, _n: &Notification) -> Result<()> {
        Ok(())
    }
}

/// Publishes to every inner sink; reports the first failure after trying all.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn publish(&self, n: &Notification) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(n).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Build the sink stack described by `[notify]`.
#[must_use]
pub fn sink_from_config(config: &NotifyConfig) -> Arc<dyn NotificationSink> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();
    if config.log_events {
        sinks.push(Arc::new(TracingSink));
    }
    if config.has_outbox() {
        sinks.push(Arc::new(JsonlSink::new(PathBuf::from(&config.outbox_path))));
    }
    match sinks.len() {
        0 => Arc::new(NullSink),
        1 => sinks.remove(0),
        _ => Arc::new(FanoutSink::new(sinks)),
    }
}
