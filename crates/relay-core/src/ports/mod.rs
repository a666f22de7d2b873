//! Ports - abstraction layer.
//!
//! Each trait is the seam to an external system (SQLite, partner HTTP
//! endpoints, wall time) and hides the implementation behind it.

pub mod clock;
pub mod delivery;
pub mod store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delivery::{DeliveryClient, DeliveryConnector, DeliveryRequest};
pub use self::store::{
    DuplicateCandidate, DuplicateKey, EventStore, PartnerStore, ProcessingStepStore,
    SubscriberStore, TaskStore,
};
