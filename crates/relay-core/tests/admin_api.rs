mod common;

use axum::http::StatusCode;
use relay_core::router;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{relay, request, text};

async fn json_of(response: axum::response::Response) -> (StatusCode, Value) {
    let (status, body) = text(response).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn partners_are_saved_and_found_by_address() {
    let relay = relay().await;
    let app = router(relay.app.clone());

    let (status, saved) = json_of(
        app.clone()
            .oneshot(request(
                "POST",
                "/admin/partners",
                r#"{"IP_ADDRESS": "127.0.0.1", "PORT": 3030, "DESCRIPTION": "Local Server"}"#,
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["ID"], json!(1));

    for uri in ["/admin/partners/127.0.0.1:3030", "/admin/partners/localhost:3030", "/admin/partners/3030"] {
        let (status, found) = json_of(app.clone().oneshot(request("GET", uri, "")).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(found["DESCRIPTION"], json!("Local Server"));
    }

    let missing = app
        .clone()
        .oneshot(request("GET", "/admin/partners/127.0.0.1:9", ""))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let (_, updated) = json_of(
        app.oneshot(request(
            "POST",
            "/admin/partners",
            r#"{"ID": 1, "IP_ADDRESS": "127.0.0.1", "PORT": 203, "DESCRIPTION": "moved"}"#,
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(updated["PORT"], json!(203));
}

#[tokio::test]
async fn subscribers_can_be_listed_added_and_removed() {
    let relay = relay().await;
    let partner = relay.partner(3030).await;
    let app = router(relay.app.clone());

    let (status, created) = json_of(
        app.clone()
            .oneshot(request(
                "POST",
                "/admin/subscribers",
                json!({"EVENT_ID": 2, "PARTNER_ID": partner}).to_string(),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["ID"].as_i64().unwrap();

    let (_, listed) = json_of(
        app.clone()
            .oneshot(request("GET", "/admin/subscribers", ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed[0]["URL"], json!("orders"));
    assert_eq!(listed[0]["METHOD"], json!("PUT"));
    assert_eq!(listed[0]["PORT"], json!(3030));

    let (status, deleted) = json_of(
        app.clone()
            .oneshot(request("DELETE", &format!("/admin/subscribers/{id}"), ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"ID": id, "DELETED": 1}));

    let (_, listed) = json_of(
        app.clone()
            .oneshot(request("GET", "/admin/subscribers", ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed, json!([]));

    let again = app
        .clone()
        .oneshot(request("DELETE", &format!("/admin/subscribers/{id}"), ""))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let gone = app
        .oneshot(request("DELETE", "/admin/subscribers/77", ""))
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscriber_needs_known_event_and_partner() {
    let relay = relay().await;
    let partner = relay.partner(3030).await;
    let app = router(relay.app.clone());

    for body in [
        json!({"EVENT_ID": 2, "PARTNER_ID": 99}),
        json!({"EVENT_ID": 99, "PARTNER_ID": partner}),
    ] {
        let (status, error) = json_of(
            app.clone()
                .oneshot(request("POST", "/admin/subscribers", body.to_string()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(error["error"].is_string());
    }
}

#[tokio::test]
async fn events_can_be_added() {
    let relay = relay().await;
    let app = router(relay.app.clone());

    let (status, event) = json_of(
        app.clone()
            .oneshot(request("POST", "/admin/events", r#"{"URL": "refunds", "METHOD": "put"}"#))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["ID"], json!(4));
    assert_eq!(event["METHOD"], json!("PUT"));

    let (_, events) = json_of(app.oneshot(request("GET", "/admin/events", "")).await.unwrap()).await;
    assert_eq!(events.as_array().map(Vec::len), Some(4));
}
