//! Store ports - narrow persistence capabilities, one per entity kind.
//!
//! The pipeline only sees `TaskStore` and `ProcessingStepStore`; the HTTP
//! layer additionally sees the lookup/admin capabilities. A single SQLite
//! registry implements all of them, but nothing depends on that.
//!
//! # Design principles
//! - Fan-out and the task's move to `Published` commit in one transaction
//! - Default reads skip soft-deleted rows
//! - A lookup miss is `Ok(None)`, never a `StoreError`

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Event, EventId, LocalId, Partner, PartnerId, ProcessingStep, State, StepId, StoreError,
    Subscriber, SubscriberId, SubscriberView, Task, TaskId,
};

/// The fields duplicate detection matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub event_id: EventId,
    pub partner_id: PartnerId,
    pub local_id: LocalId,
}

impl DuplicateKey {
    pub fn of(task: &Task) -> Self {
        Self {
            event_id: task.event_id,
            partner_id: task.partner_id,
            local_id: task.local_id.clone(),
        }
    }
}

/// An existing task sharing a [`DuplicateKey`], joined to its event.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCandidate {
    pub task_id: TaskId,
    pub state: State,
    pub updated_on: DateTime<Utc>,
    /// HTTP method of the event the task arrived through.
    pub method: String,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every task with the same event, partner and local id.
    async fn duplicate_candidates(
        &self,
        key: &DuplicateKey,
    ) -> Result<Vec<DuplicateCandidate>, StoreError>;

    /// Persist a new task and return its generated id.
    async fn insert_task(&self, task: &Task) -> Result<TaskId, StoreError>;

    async fn task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    async fn tasks_in_state(&self, state: State) -> Result<Vec<Task>, StoreError>;

    /// Insert one processing step per subscriber of the task's event and
    /// mark the task `Published`, atomically. Returns the number of steps.
    async fn spread_task(&self, id: TaskId) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait ProcessingStepStore: Send + Sync {
    /// Steps in `New` or `InProgress` with their delivery target resolved.
    async fn pending_steps(&self) -> Result<Vec<ProcessingStep>, StoreError>;

    async fn steps_of_task(&self, task_id: TaskId) -> Result<Vec<ProcessingStep>, StoreError>;

    /// Returns the number of affected rows.
    async fn update_step_state(&self, id: StepId, state: State) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn event_by_route(&self, url: &str, method: &str) -> Result<Option<Event>, StoreError>;

    async fn events(&self) -> Result<Vec<Event>, StoreError>;

    async fn insert_event(&self, event: &Event) -> Result<EventId, StoreError>;
}

#[async_trait]
pub trait PartnerStore: Send + Sync {
    async fn partner(&self, id: PartnerId) -> Result<Option<Partner>, StoreError>;

    async fn partner_by_address(
        &self,
        ip_address: std::net::IpAddr,
        port: u16,
    ) -> Result<Option<Partner>, StoreError>;

    /// Insert when `partner.id` is unsaved, update otherwise. Returns the
    /// stored row.
    async fn save_partner(&self, partner: &Partner) -> Result<Partner, StoreError>;
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn subscribers(&self) -> Result<Vec<SubscriberView>, StoreError>;

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<SubscriberId, StoreError>;

    /// Soft delete. Returns the number of affected rows.
    async fn delete_subscriber(&self, id: SubscriberId) -> Result<usize, StoreError>;
}
