//! Admin views over partners, subscribers and events, as JSON.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::Json;
use axum::extract::{ConnectInfo, FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::app::App;
use crate::domain::entity::{LOOPBACK, NetlocError, parse_netloc};
use crate::domain::{Event, Partner, StoreError, Subscriber, SubscriberId, SubscriberView};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Netloc(#[from] NetlocError),

    #[error("no partner at {0}")]
    UnknownPartner(String),

    #[error("subscriber {0} not found")]
    UnknownSubscriber(SubscriberId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::Netloc(_) | AdminError::UnknownPartner(_) => StatusCode::BAD_REQUEST,
            AdminError::UnknownSubscriber(_) => StatusCode::NOT_FOUND,
            AdminError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AdminError::Store(StoreError::Constraint(_)) => StatusCode::BAD_REQUEST,
            AdminError::Store(e) => {
                tracing::error!(error = %e, "admin request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Address of the caller, loopback when the server runs without connect
/// info (tests, in-process routers).
pub struct RemoteIp(pub IpAddr);

impl<S: Send + Sync> FromRequestParts<S> for RemoteIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(LOOPBACK);
        Ok(Self(ip))
    }
}

/// `GET /admin/partners/{value}`, value being `ip:port`, `ip` or `port`.
pub async fn get_partner(
    State(app): State<App>,
    RemoteIp(remote): RemoteIp,
    Path(value): Path<String>,
) -> Result<Json<Partner>, AdminError> {
    let (ip, port) = parse_netloc(&value, remote)?;
    tracing::debug!(%ip, port, "partner lookup");
    app.partners
        .partner_by_address(ip, port)
        .await?
        .map(Json)
        .ok_or_else(|| AdminError::UnknownPartner(format!("{ip}:{port}")))
}

/// `POST /admin/partners`: id 0 inserts, any other id updates.
pub async fn save_partner(
    State(app): State<App>,
    Json(partner): Json<Partner>,
) -> Result<Json<Partner>, AdminError> {
    let saved = app.partners.save_partner(&partner).await?;
    tracing::info!(partner_id = %saved.id, ip = %saved.ip_address, port = saved.port, "partner saved");
    Ok(Json(saved))
}

pub async fn list_subscribers(
    State(app): State<App>,
) -> Result<Json<Vec<SubscriberView>>, AdminError> {
    Ok(Json(app.subscribers.subscribers().await?))
}

pub async fn create_subscriber(
    State(app): State<App>,
    Json(subscriber): Json<Subscriber>,
) -> Result<(StatusCode, Json<serde_json::Value>), AdminError> {
    let id = app.subscribers.insert_subscriber(&subscriber).await?;
    tracing::info!(subscriber_id = %id, event_id = %subscriber.event_id, partner_id = %subscriber.partner_id, "subscriber added");
    Ok((StatusCode::CREATED, Json(json!({ "ID": id }))))
}

/// Soft delete.
pub async fn delete_subscriber(
    State(app): State<App>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let id = SubscriberId::new(id);
    if app.subscribers.delete_subscriber(id).await? == 0 {
        return Err(AdminError::UnknownSubscriber(id));
    }
    tracing::info!(subscriber_id = %id, "subscriber deleted");
    Ok(Json(json!({ "ID": id, "DELETED": 1 })))
}

pub async fn list_events(State(app): State<App>) -> Result<Json<Vec<Event>>, AdminError> {
    Ok(Json(app.events.events().await?))
}

pub async fn create_event(
    State(app): State<App>,
    Json(mut event): Json<Event>,
) -> Result<(StatusCode, Json<Event>), AdminError> {
    event.method = event.method.to_ascii_uppercase();
    event.id = app.events.insert_event(&event).await?;
    tracing::info!(event_id = %event.id, url = %event.url, method = %event.method, "event added");
    Ok((StatusCode::CREATED, Json(event)))
}
