#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use relay_core::domain::{Event, Partner, PartnerId, Subscriber, SubscriberId};
use relay_core::impls::{HttpConnector, SqliteRegistry};
use relay_core::ports::{EventStore, PartnerStore, SubscriberStore, SystemClock};
use relay_core::{App, AppBuilder};
use std::time::Duration;

pub const LOCAL: IpAddr = IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);

pub struct Relay {
    pub registry: Arc<SqliteRegistry>,
    pub app: App,
}

/// An in-memory relay with events `orders` (POST, PUT) and `invoices` (PUT),
/// and no partners yet.
pub async fn relay() -> Relay {
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(SqliteRegistry::open_in_memory(clock.clone()).unwrap());
    for (url, method) in [("orders", "POST"), ("orders", "PUT"), ("invoices", "PUT")] {
        registry.insert_event(&Event::new(url, method)).await.unwrap();
    }
    let app = AppBuilder::new()
        .registry(registry.clone())
        .connector(Arc::new(HttpConnector::new()))
        .clock(clock)
        .delivery_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    Relay { registry, app }
}

impl Relay {
    pub async fn partner(&self, port: u16) -> PartnerId {
        self.registry
            .save_partner(&Partner::new(LOCAL, port))
            .await
            .unwrap()
            .id
    }

    pub async fn subscribe(&self, url: &str, method: &str, partner_id: PartnerId) {
        let event = self
            .registry
            .event_by_route(url, method)
            .await
            .unwrap()
            .unwrap();
        self.registry
            .insert_subscriber(&Subscriber {
                id: SubscriberId::UNSAVED,
                event_id: event.id,
                partner_id,
            })
            .await
            .unwrap();
    }
}

pub fn request(method: &str, uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

pub async fn text(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
