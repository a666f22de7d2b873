//! A receiving partner that accepts everything, for trying the relay out.

use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{Method, StatusCode};
use axum::routing::post;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

async fn accept(Path(name): Path<String>, method: Method, body: Bytes) -> StatusCode {
    tracing::info!(%name, %method, body = %String::from_utf8_lossy(&body), "received");
    StatusCode::OK
}

pub async fn run(port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/transactions/{name}", post(accept).put(accept))
        .layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "sink listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
