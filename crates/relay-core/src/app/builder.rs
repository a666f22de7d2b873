//! AppBuilder - wiring of stores, pipeline, scheduler and delivery.
//!
//! # Fail-fast
//! `build()` refuses to produce an `App` with a missing store or
//! connector, or with a zero interval or timeout, instead of failing on
//! the first request or the first cycle.

use std::sync::Arc;
use std::time::Duration;

use crate::app::pipeline::{DEFAULT_DELIVERY_TIMEOUT, TransactionPipeline};
use crate::app::scheduler::{DEFAULT_INTERVAL, SchedulerLoop};
use crate::ports::{
    Clock, DeliveryConnector, EventStore, PartnerStore, ProcessingStepStore, SubscriberStore,
    SystemClock, TaskStore,
};

/// Everything that implements every store port.
pub trait Registry:
    TaskStore + ProcessingStepStore + EventStore + PartnerStore + SubscriberStore + 'static
{
}

impl<T> Registry for T where
    T: TaskStore + ProcessingStepStore + EventStore + PartnerStore + SubscriberStore + 'static
{
}

/// AppBuilder collects the collaborators of an [`App`].
///
/// # Example
/// ```ignore
/// let app = AppBuilder::new()
///     .registry(Arc::new(SqliteRegistry::open(path, clock.clone())?))
///     .connector(Arc::new(HttpConnector::new()))
///     .clock(clock)
///     .interval(Duration::from_secs(5))
///     .build()?;
/// ```
pub struct AppBuilder {
    tasks: Option<Arc<dyn TaskStore>>,
    steps: Option<Arc<dyn ProcessingStepStore>>,
    events: Option<Arc<dyn EventStore>>,
    partners: Option<Arc<dyn PartnerStore>>,
    subscribers: Option<Arc<dyn SubscriberStore>>,
    connector: Option<Arc<dyn DeliveryConnector>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    delivery_timeout: Duration,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing store: {0}")]
    MissingStore(&'static str),

    #[error("missing delivery connector")]
    MissingConnector,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            tasks: None,
            steps: None,
            events: None,
            partners: None,
            subscribers: None,
            connector: None,
            clock: Arc::new(SystemClock),
            interval: DEFAULT_INTERVAL,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    /// Use one registry for every store port.
    pub fn registry<R: Registry>(self, registry: Arc<R>) -> Self {
        self.tasks(registry.clone())
            .steps(registry.clone())
            .events(registry.clone())
            .partners(registry.clone())
            .subscribers(registry)
    }

    pub fn tasks(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn steps(mut self, steps: Arc<dyn ProcessingStepStore>) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventStore>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn partners(mut self, partners: Arc<dyn PartnerStore>) -> Self {
        self.partners = Some(partners);
        self
    }

    pub fn subscribers(mut self, subscribers: Arc<dyn SubscriberStore>) -> Self {
        self.subscribers = Some(subscribers);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn DeliveryConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let tasks = self.tasks.ok_or(BuildError::MissingStore("tasks"))?;
        let steps = self.steps.ok_or(BuildError::MissingStore("processing steps"))?;
        let events = self.events.ok_or(BuildError::MissingStore("events"))?;
        let partners = self.partners.ok_or(BuildError::MissingStore("partners"))?;
        let subscribers = self
            .subscribers
            .ok_or(BuildError::MissingStore("subscribers"))?;
        let connector = self.connector.ok_or(BuildError::MissingConnector)?;
        if self.interval.is_zero() {
            return Err(BuildError::ZeroDuration("scheduler interval"));
        }
        if self.delivery_timeout.is_zero() {
            return Err(BuildError::ZeroDuration("delivery timeout"));
        }

        let pipeline = Arc::new(
            TransactionPipeline::new(tasks.clone(), steps.clone(), self.clock)
                .with_delivery_timeout(self.delivery_timeout),
        );
        let scheduler = Arc::new(
            SchedulerLoop::new(pipeline.clone(), tasks, steps, connector)
                .with_interval(self.interval),
        );
        Ok(App {
            pipeline,
            scheduler,
            events,
            partners,
            subscribers,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The wired application: the pipeline and scheduler plus the stores the
/// HTTP layer reads directly.
#[derive(Clone)]
pub struct App {
    pub pipeline: Arc<TransactionPipeline>,
    pub scheduler: Arc<SchedulerLoop>,
    pub events: Arc<dyn EventStore>,
    pub partners: Arc<dyn PartnerStore>,
    pub subscribers: Arc<dyn SubscriberStore>,
}
