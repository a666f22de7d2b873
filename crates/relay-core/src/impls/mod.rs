//! Impls - implementations of the ports.
//!
//! - **SqliteRegistry**: every store port on one SQLite file
//! - **HttpConnector**: partner delivery over HTTP

pub mod http;
pub mod sqlite;

pub use self::http::{HttpConnector, HttpDelivery};
pub use self::sqlite::SqliteRegistry;
