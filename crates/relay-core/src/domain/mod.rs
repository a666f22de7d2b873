//! Domain model (ids, states, entities, inbound requests, errors).

pub mod entity;
pub mod errors;
pub mod ids;
pub mod inbound;
pub mod state;

pub use entity::{
    DeliveryTarget, EntityKind, Event, LocalId, Partner, ProcessingStep, RowMeta, Subscriber,
    SubscriberView, Task,
};
pub use errors::{DeliveryError, ErrorKind, StoreError};
pub use ids::{EventId, PartnerId, StepId, SubscriberId, TaskId};
pub use inbound::InboundTransaction;
pub use state::{Reply, State};
