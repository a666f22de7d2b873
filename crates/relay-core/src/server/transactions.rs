//! Inbound transactions: `POST|PUT /transactions/{name}`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::app::App;
use crate::domain::Reply;

/// Look the event up by route, then receive and store the body.
///
/// - 201 with `/{event}/{local id}/{task id}` once stored
/// - 400 with the reason on any rejection
/// - 501 when no event matches name and method
pub async fn receive_transaction(
    State(app): State<App>,
    Path(name): Path<String>,
    method: Method,
    body: Bytes,
) -> Response {
    let event = match app.events.event_by_route(&name, method.as_str()).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::warn!(%name, %method, "no such event");
            return StatusCode::NOT_IMPLEMENTED.into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "event lookup failed");
            return reply(Reply::BadRequestDBError);
        }
    };

    let mut tx = app.pipeline.begin();
    let received = tx.receive(&body, Some(&event));
    if !received.is_success() {
        tracing::warn!(%name, reason = received.reason(), "request rejected");
        return reply(received);
    }
    let stored = tx.store().await;
    if !stored.is_success() {
        tracing::warn!(%name, reason = stored.reason(), "request not stored");
        return reply(stored);
    }
    let message = tx.message().unwrap_or_default();
    (StatusCode::CREATED, message).into_response()
}

fn reply(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status()).unwrap_or(StatusCode::BAD_REQUEST);
    (status, reply.reason()).into_response()
}
