//! Per-step notifications for live streaming of a running task.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::task::Step;

/// Receives each completed step, in order, before the next step starts.
///
/// A returned error is logged and otherwise ignored; it never aborts the task.
#[async_trait]
pub trait StepCallback: Send + Sync {
    async fn on_step(&self, step: &Step) -> evos_core::Result<()>;
}

#[async_trait]
impl StepCallback for mpsc::Sender<Step> {
    async fn on_step(&self, step: &Step) -> evos_core::Result<()> {
        self.send(step.clone())
            .await
            .map_err(|_| evos_core::Error::Internal("step receiver dropped".into()))
    }
}
