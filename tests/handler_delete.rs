mod common;

use axum::{Router, routing::delete};
use axum_test::TestServer;
use shortlink::api::handlers::delete_handler;
use shortlink::domain::entities::ObjectCredential;
use shortlink::domain::repositories::KeyStore;

fn delete_app(state: shortlink::AppState) -> TestServer {
    let app = Router::new()
        .route("/{token}", delete(delete_handler))
        .with_state(state);
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_delete_removes_token() {
    let state = common::create_test_state();
    let server = delete_app(state.clone());

    common::seed_token(&state, "doomed", "https://example.com").await;

    let response = server.delete("/doomed").await;

    response.assert_status(axum::http::StatusCode::NO_CONTENT);
    assert!(!state.store.exists("doomed").await.unwrap());
}

#[tokio::test]
async fn test_delete_unknown_token() {
    let state = common::create_test_state();
    let server = delete_app(state);

    let response = server.delete("/missing1").await;

    response.assert_status_not_found();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "not_found");
}

/// Deleting an object-backed token drops its credential entry with it.
#[tokio::test]
async fn test_delete_drops_credential() {
    let state = common::create_test_state();
    let server = delete_app(state.clone());

    let credential = ObjectCredential {
        access: "AKIATEST".to_string(),
        secret: "s3cr3t".to_string(),
    };
    state
        .store
        .set_with_credential(
            "report",
            &common::object_url("report.pdf"),
            None,
            true,
            &credential,
        )
        .await
        .unwrap();

    let response = server.delete("/report").await;

    response.assert_status(axum::http::StatusCode::NO_CONTENT);
    assert!(state.store.get_credential("report").await.unwrap().is_none());
}
