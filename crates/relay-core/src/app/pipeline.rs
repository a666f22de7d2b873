//! TransactionPipeline - receive, store, spread, process.
//!
//! # Lifecycle
//! ```text
//! receive ──> store ──────> spread ─────────> process
//!  (memory)   Task: New     Task: Published    Step: InProgress ──> Processed
//!                           Steps: New                          ├─> Error
//!                                                               └─> InProgress (retry)
//! ```
//!
//! Inbound requests go through a short-lived [`Transaction`] (receive then
//! store). Spread and process are driven by the scheduler loop.
//!
//! # Example
//! ```ignore
//! let mut tx = pipeline.begin();
//! if tx.receive(&body, Some(&event)) == Reply::RequestReceived
//!     && tx.store().await == Reply::RequestStored
//! {
//!     println!("{}", tx.message().unwrap_or_default());
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::app::duplicate::{self, DuplicateDetector};
use crate::domain::{
    Event, InboundTransaction, ProcessingStep, Reply, RowMeta, State, StoreError, Task, TaskId,
};
use crate::ports::{Clock, DeliveryClient, DeliveryRequest, ProcessingStepStore, TaskStore};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_millis(1000);

pub struct TransactionPipeline {
    tasks: Arc<dyn TaskStore>,
    steps: Arc<dyn ProcessingStepStore>,
    detector: DuplicateDetector,
    clock: Arc<dyn Clock>,
    delivery_timeout: Duration,
}

impl TransactionPipeline {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        steps: Arc<dyn ProcessingStepStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            detector: DuplicateDetector::new(Arc::clone(&tasks), Arc::clone(&clock)),
            tasks,
            steps,
            clock,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    /// Start handling one inbound request.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction {
            pipeline: self,
            task: None,
            event_url: String::new(),
        }
    }

    /// Fan a stored task out to the subscribers of its event and mark it
    /// `Published`, in one storage transaction.
    ///
    /// Storage failures are returned to the caller as-is.
    pub async fn spread(&self, task_id: TaskId) -> Result<Reply, StoreError> {
        let steps = self.tasks.spread_task(task_id).await?;
        tracing::info!(task_id = %task_id, steps, "task published");
        Ok(Reply::RequestStored)
    }

    /// Deliver one step to its partner and record the outcome.
    ///
    /// | outcome               | step state   | reply           |
    /// |-----------------------|--------------|-----------------|
    /// | 2xx                   | `Processed`  | `RequestStored` |
    /// | any other status      | `Error`      | `BadRequest`    |
    /// | timeout, refused, ... | `InProgress` | `BadRequest`    |
    ///
    /// Only a storage failure is an `Err`.
    pub async fn process(
        &self,
        step: &ProcessingStep,
        client: &dyn DeliveryClient,
    ) -> Result<Reply, StoreError> {
        self.steps
            .update_step_state(step.id, State::InProgress)
            .await?;

        let request = DeliveryRequest::for_step(step, self.delivery_timeout);
        tracing::info!(step_id = %step.id, method = %request.method, url = %request.url, "delivering");

        let (state, reply) = match client.send(&request).await {
            Ok(status) if (200..300).contains(&status) => (State::Processed, Reply::RequestStored),
            Ok(status) => {
                tracing::warn!(step_id = %step.id, status, "partner rejected delivery");
                (State::Error, Reply::BadRequest)
            }
            Err(e) => {
                tracing::error!(step_id = %step.id, error = %e, "delivery failed, will retry");
                (State::InProgress, Reply::BadRequest)
            }
        };
        self.steps.update_step_state(step.id, state).await?;
        Ok(reply)
    }
}

/// One inbound request on its way into storage.
///
/// Holds the candidate task between [`receive`](Transaction::receive) and
/// [`store`](Transaction::store).
pub struct Transaction<'a> {
    pipeline: &'a TransactionPipeline,
    task: Option<Task>,
    event_url: String,
}

impl Transaction<'_> {
    /// Validate `body` and build the candidate task.
    ///
    /// With `event`, the event comes from the route and `EVENT_ID` in the
    /// body is ignored. Without it, `EVENT_ID` is mandatory.
    pub fn receive(&mut self, body: &[u8], event: Option<&Event>) -> Reply {
        let inbound = match InboundTransaction::parse(body) {
            Ok(inbound) => inbound,
            Err(reply) => return reply,
        };
        let event_id = match (event, inbound.event_id) {
            (Some(event), _) => {
                self.event_url = event.url.clone();
                event.id
            }
            (None, Some(id)) => id,
            (None, None) => return Reply::BadRequestMandatoryKey,
        };
        self.task = Some(Task {
            id: TaskId::UNSAVED,
            local_id: inbound.local_id,
            partner_id: inbound.partner_id,
            event_id,
            data: inbound.data,
            state: State::New,
            meta: RowMeta::at(self.pipeline.clock.now()),
        });
        Reply::RequestReceived
    }

    /// Run duplicate detection on the received task and persist it.
    ///
    /// Never fails: storage errors come back as `BadRequestDBError`.
    pub async fn store(&mut self) -> Reply {
        let Some(task) = self.task.as_mut() else {
            return Reply::BadRequestMandatoryKey;
        };
        let score = match self.pipeline.detector.score(task).await {
            Ok(score) => score,
            Err(e) => {
                tracing::error!(error = %e, "duplicate check failed");
                return Reply::BadRequestDBError;
            }
        };
        if duplicate::is_conflict(score) {
            tracing::warn!(local_id = %task.local_id, score, "rejected as duplicate");
            return Reply::ConflictRequest;
        }
        match self.pipeline.tasks.insert_task(task).await {
            Ok(id) => {
                task.id = id;
                tracing::info!(task_id = %id, local_id = %task.local_id, "task stored");
                Reply::RequestStored
            }
            Err(e) => {
                tracing::error!(error = %e, "task insert failed");
                Reply::BadRequestDBError
            }
        }
    }

    /// `/{event url}/{local id}/{task id}` once the task is stored.
    pub fn message(&self) -> Option<String> {
        self.task
            .as_ref()
            .filter(|task| !task.id.is_unsaved())
            .map(|task| format!("/{}/{}/{}", self.event_url, task.local_id, task.id))
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }
}
