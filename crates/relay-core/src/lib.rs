//! relay-core
//!
//! Webhook-style event relay: partners send transactions tied to a named
//! event, the relay stores each one once and forwards it to every partner
//! subscribed to that event.
//!
//! # Modules
//! - **domain**: ids, states, entities, inbound request, errors
//! - **ports**: clock, store capabilities, delivery client
//! - **impls**: SQLite registry, reqwest delivery
//! - **app**: duplicate detector, pipeline, scheduler, builder
//! - **server**: axum routes for transactions and admin views

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod server;

pub use app::{App, AppBuilder};
pub use server::router;
