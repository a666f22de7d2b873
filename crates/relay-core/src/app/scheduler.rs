//! SchedulerLoop - drives spread and process on a timer.
//!
//! # Cycle
//! 1. spread every task in `New`
//! 2. process every step in `New` or `InProgress`, sequentially, over one
//!    delivery session
//! 3. sleep `interval`, or stop when cancelled
//!
//! # Error handling
//! - a failing spread or process is logged and the cycle moves on to the
//!   next item
//! - failing to read the pending lists ends that cycle only
//! - cancellation is observed between cycles and at the sleep; an
//!   in-flight delivery is not interrupted

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::app::pipeline::TransactionPipeline;
use crate::domain::{Reply, State, StoreError};
use crate::ports::{DeliveryConnector, ProcessingStepStore, TaskStore};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub spread: usize,
    pub spread_failed: usize,
    pub delivered: usize,
    /// Rejected by the partner or not reached.
    pub not_delivered: usize,
    pub process_failed: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

pub struct SchedulerLoop {
    pipeline: Arc<TransactionPipeline>,
    tasks: Arc<dyn TaskStore>,
    steps: Arc<dyn ProcessingStepStore>,
    connector: Arc<dyn DeliveryConnector>,
    interval: Duration,
}

impl SchedulerLoop {
    pub fn new(
        pipeline: Arc<TransactionPipeline>,
        tasks: Arc<dyn TaskStore>,
        steps: Arc<dyn ProcessingStepStore>,
        connector: Arc<dyn DeliveryConnector>,
    ) -> Self {
        Self {
            pipeline,
            tasks,
            steps,
            connector,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(interval = ?self.interval, "scheduler started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.run_cycle().await {
                Ok(report) if report.is_idle() => tracing::debug!("nothing to do"),
                Ok(report) => tracing::info!(?report, "cycle done"),
                Err(e) => tracing::error!(error = %e, "cycle aborted"),
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::warn!("scheduler cancelled");
    }

    /// One pass over pending work.
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let mut report = CycleReport::default();

        for task in self.tasks.tasks_in_state(State::New).await? {
            match self.pipeline.spread(task.id).await {
                Ok(_) => report.spread += 1,
                Err(e) => {
                    tracing::error!(task_id = %task.id, error = %e, "spread failed");
                    report.spread_failed += 1;
                }
            }
        }

        let pending = self.steps.pending_steps().await?;
        if pending.is_empty() {
            return Ok(report);
        }
        let client = match self.connector.connect() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "no delivery session, steps stay pending");
                return Ok(report);
            }
        };
        for step in &pending {
            match self.pipeline.process(step, client.as_ref()).await {
                Ok(Reply::RequestStored) => report.delivered += 1,
                Ok(_) => report.not_delivered += 1,
                Err(e) => {
                    tracing::error!(step_id = %step.id, error = %e, "process failed");
                    report.process_failed += 1;
                }
            }
        }
        Ok(report)
    }
}
