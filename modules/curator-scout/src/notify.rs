//! Lifecycle notifications for whatever presents a run (UI, socket, log).
//! The workflow emits; it owns no transport.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use curator_common::Evaluation;

/// Pipeline stages as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CriteriaExtraction,
    Discovery,
    Evaluation,
    Adaptation,
    Finalization,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::CriteriaExtraction => "criteria_extraction",
            Stage::Discovery => "discovery",
            Stage::Evaluation => "evaluation",
            Stage::Adaptation => "adaptation",
            Stage::Finalization => "finalization",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    StageStarted {
        stage: Stage,
    },
    StageCompleted {
        stage: Stage,
    },
    ItemFound {
        title: String,
        source_url: String,
    },
    Progress {
        candidates: usize,
        required: usize,
        evaluated: usize,
        discovered: usize,
        attempt: u32,
    },
    FinalResult {
        recommendations: Vec<Evaluation>,
    },
}

/// Pluggable notification backend.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    async fn send(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Discards everything.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn send(&self, _notification: Notification) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Forwards notifications to an unbounded channel for a presentation layer.
pub struct ChannelBackend {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotifyBackend for ChannelBackend {
    async fn send(&self, notification: Notification) -> anyhow::Result<()> {
        self.tx
            .send(notification)
            .map_err(|_| anyhow::anyhow!("notification receiver dropped"))
    }
}

/// Writes notifications to the tracing log. Used by the CLI.
pub struct LogBackend;

#[async_trait]
impl NotifyBackend for LogBackend {
    async fn send(&self, notification: Notification) -> anyhow::Result<()> {
        match &notification {
            Notification::StageStarted { stage } => info!(%stage, "Stage started"),
            Notification::StageCompleted { stage } => info!(%stage, "Stage completed"),
            Notification::ItemFound { title, source_url } => {
                info!(title = title.as_str(), source_url = source_url.as_str(), "Item found")
            }
            Notification::Progress {
                candidates,
                required,
                evaluated,
                discovered,
                attempt,
            } => info!(candidates, required, evaluated, discovered, attempt, "Progress"),
            Notification::FinalResult { recommendations } => {
                info!(count = recommendations.len(), "Final result")
            }
        }
        Ok(())
    }
}

/// Send and swallow failures: a missing observer never fails a run.
pub async fn emit(backend: &dyn NotifyBackend, notification: Notification) {
    if let Err(e) = backend.send(notification).await {
        warn!(error = %e, "Failed to deliver notification");
    }
}
