//! Entity records: events, partners, subscribers, tasks and processing steps.
//!
//! Field names serialize as SCREAMING_SNAKE_CASE, the same shape the admin
//! views and the inbound wire format use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use super::ids::{EventId, PartnerId, StepId, SubscriberId, TaskId};
use super::state::State;

/// The closed set of persisted collections.
///
/// Storage code resolves tables and row decoders from this tag; nothing is
/// ever looked up by a free-form name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Events,
    Partners,
    Subscribers,
    Tasks,
    ProcessingSteps,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Events => "EVENTS",
            EntityKind::Partners => "PARTNERS",
            EntityKind::Subscribers => "SUBSCRIBERS",
            EntityKind::Tasks => "TASKS",
            EntityKind::ProcessingSteps => "PROCESSING_STEPS",
        }
    }

    /// Only tasks and processing steps carry a `STATE` column.
    pub fn has_state(self) -> bool {
        matches!(self, EntityKind::Tasks | EntityKind::ProcessingSteps)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Bookkeeping columns every table has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RowMeta {
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

impl RowMeta {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            created_on: now,
            updated_on: now,
            deleted: false,
        }
    }
}

/// A named, method-qualified transaction type, e.g. "orders" via PUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Event {
    #[serde(default)]
    pub id: EventId,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub description: String,
}

fn default_method() -> String {
    "POST".to_string()
}

impl Event {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: EventId::UNSAVED,
            url: url.into(),
            method: method.into().to_ascii_uppercase(),
            description: String::new(),
        }
    }
}

/// A delivery target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Partner {
    #[serde(default)]
    pub id: PartnerId,
    pub ip_address: IpAddr,
    pub port: u16,
    #[serde(default)]
    pub description: String,
}

impl Partner {
    pub fn new(ip_address: IpAddr, port: u16) -> Self {
        Self {
            id: PartnerId::UNSAVED,
            ip_address,
            port,
            description: String::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.ip_address.is_loopback()
    }
}

/// Error of [`parse_netloc`].
#[derive(Debug, thiserror::Error)]
#[error("not a partner address: {0}")]
pub struct NetlocError(String);

const DEFAULT_PORT: u16 = 80;

/// Parses a partner address as written in admin urls.
///
/// Accepted shapes:
/// - `ip:port` (`localhost` is read as 127.0.0.1)
/// - `port` alone, paired with `remote`
/// - `ip` alone, paired with port 80
pub fn parse_netloc(value: &str, remote: IpAddr) -> Result<(IpAddr, u16), NetlocError> {
    let value = value.trim().replace("localhost", "127.0.0.1");
    if let Ok(port) = value.parse::<u16>() {
        return Ok((remote, port));
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Ok((ip, DEFAULT_PORT));
    }
    if let Ok(addr) = value.parse::<std::net::SocketAddr>() {
        return Ok((addr.ip(), addr.port()));
    }
    Err(NetlocError(value))
}

pub const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Which partner receives which event's transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Subscriber {
    #[serde(default)]
    pub id: SubscriberId,
    pub event_id: EventId,
    pub partner_id: PartnerId,
}

/// A subscriber with its event and partner pulled in, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SubscriberView {
    pub id: SubscriberId,
    pub event_id: EventId,
    pub partner_id: PartnerId,
    pub url: String,
    pub method: String,
    pub ip_address: IpAddr,
    pub port: u16,
    pub description: String,
}

/// The partner's own identifier of a transaction (the `ID` inside `DATA`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Only JSON integers and strings identify a transaction.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(|i| i.to_string())
                .or_else(|| n.as_u64().map(|u| u.to_string()))
                .map(Self),
            serde_json::Value::String(s) => Some(Self(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self("0".to_string())
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored, deduplicated inbound transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Task {
    pub id: TaskId,
    pub local_id: LocalId,
    pub partner_id: PartnerId,
    pub event_id: EventId,
    /// Opaque serialized payload, forwarded verbatim to subscribers.
    pub data: String,
    pub state: State,
    #[serde(flatten)]
    pub meta: RowMeta,
}

/// Resolved address and route of one delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DeliveryTarget {
    pub ip_address: IpAddr,
    pub port: u16,
    pub method: String,
    pub url: String,
}

impl DeliveryTarget {
    pub fn endpoint(&self) -> String {
        let host = match self.ip_address {
            IpAddr::V4(ip) => ip.to_string(),
            IpAddr::V6(ip) => format!("[{ip}]"),
        };
        format!("http://{}:{}/transactions/{}", host, self.port, self.url)
    }
}

/// One outbound delivery obligation of a task to one subscribed partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProcessingStep {
    pub id: StepId,
    pub task_id: TaskId,
    pub partner_id: PartnerId,
    pub local_id: LocalId,
    pub event_id: EventId,
    pub data: String,
    #[serde(flatten)]
    pub target: DeliveryTarget,
    pub state: State,
    #[serde(flatten)]
    pub meta: RowMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn netloc_accepts_ip_and_port() {
        let remote = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(
            parse_netloc("127.0.0.1:3030", remote).unwrap(),
            (LOOPBACK, 3030)
        );
        assert_eq!(
            parse_netloc("localhost:3030", remote).unwrap(),
            (LOOPBACK, 3030)
        );
    }

    #[test]
    fn netloc_port_only_uses_remote_address() {
        let remote = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(parse_netloc("3030", remote).unwrap(), (remote, 3030));
    }

    #[test]
    fn netloc_ip_only_defaults_port() {
        assert_eq!(
            parse_netloc("192.168.1.4", LOOPBACK).unwrap(),
            ("192.168.1.4".parse().unwrap(), 80)
        );
        assert!(parse_netloc("not-an-address", LOOPBACK).is_err());
    }

    #[test]
    fn loopback_partner_is_local() {
        assert!(Partner::new(LOOPBACK, 3030).is_local());
        assert!(Partner::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 3030).is_local());
        assert!(!Partner::new("8.8.8.8".parse().unwrap(), 80).is_local());
    }

    #[test]
    fn local_id_from_json_accepts_numbers_and_strings() {
        assert_eq!(
            LocalId::from_json(&serde_json::json!(239)),
            Some(LocalId::new("239"))
        );
        assert_eq!(
            LocalId::from_json(&serde_json::json!("A-7")),
            Some(LocalId::new("A-7"))
        );
        assert_eq!(LocalId::from_json(&serde_json::json!(239.0)), None);
        assert_eq!(LocalId::from_json(&serde_json::json!(1.5)), None);
        assert_eq!(LocalId::from_json(&serde_json::json!({"x": 1})), None);
        assert_eq!(LocalId::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn endpoint_brackets_ipv6() {
        let target = DeliveryTarget {
            ip_address: IpAddr::V6(Ipv6Addr::LOCALHOST),
            port: 8080,
            method: "PUT".into(),
            url: "orders".into(),
        };
        assert_eq!(target.endpoint(), "http://[::1]:8080/transactions/orders");
    }
}
