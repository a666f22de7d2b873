//! HTTP surface on axum.
//!
//! | route                       | methods           |
//! |-----------------------------|-------------------|
//! | `/transactions/{name}`      | POST, PUT         |
//! | `/admin/partners`           | POST              |
//! | `/admin/partners/{value}`   | GET               |
//! | `/admin/subscribers`        | GET, POST         |
//! | `/admin/subscribers/{id}`   | DELETE            |
//! | `/admin/events`             | GET, POST         |

pub mod admin;
pub mod transactions;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::app::App;

pub fn router(app: App) -> Router {
    Router::new()
        .route(
            "/transactions/{name}",
            post(transactions::receive_transaction).put(transactions::receive_transaction),
        )
        .route("/admin/partners", post(admin::save_partner))
        .route("/admin/partners/{value}", get(admin::get_partner))
        .route(
            "/admin/subscribers",
            get(admin::list_subscribers).post(admin::create_subscriber),
        )
        .route("/admin/subscribers/{id}", delete(admin::delete_subscriber))
        .route(
            "/admin/events",
            get(admin::list_events).post(admin::create_event),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}
