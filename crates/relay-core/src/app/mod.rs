//! App - application layer.
//!
//! Combines the ports into the relay's behaviour.
//!
//! # Components
//! - **DuplicateDetector**: resend risk score of an incoming transaction
//! - **TransactionPipeline**: receive, store, spread, process
//! - **SchedulerLoop**: spread and process on a timer
//! - **AppBuilder**: wiring with start-up validation

pub mod builder;
pub mod duplicate;
pub mod pipeline;
pub mod scheduler;

pub use self::builder::{App, AppBuilder, BuildError, Registry};
pub use self::duplicate::DuplicateDetector;
pub use self::pipeline::{Transaction, TransactionPipeline};
pub use self::scheduler::{CycleReport, SchedulerLoop};
