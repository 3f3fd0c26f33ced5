mod common;

use axum::{Router, routing::get};
use axum_test::TestServer;
use shortlink::api::handlers::redirect_handler;
use shortlink::domain::entities::ObjectCredential;
use shortlink::domain::repositories::KeyStore;

fn redirect_app(state: shortlink::AppState) -> TestServer {
    let app = Router::new()
        .route("/{token}", get(redirect_handler))
        .with_state(state);
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_redirect_to_plain_target() {
    let state = common::create_test_state();
    let server = redirect_app(state.clone());

    common::seed_token(&state, "plain1", "https://example.com/target").await;

    let response = server.get("/plain1").await;

    assert_eq!(response.status_code(), 307);
    let location = response.header("location");
    assert_eq!(location, "https://example.com/target");
}

#[tokio::test]
async fn test_redirect_unknown_token() {
    let state = common::create_test_state();
    let server = redirect_app(state);

    let response = server.get("/missing1").await;

    response.assert_status_not_found();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "not_found");
}

/// An object-backed token with a stored credential redirects to a freshly
/// presigned URL instead of the stored target.
#[tokio::test]
async fn test_redirect_presigns_for_credentialed_token() {
    let state = common::create_test_state();
    let server = redirect_app(state.clone());

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

    let response = server.get("/report").await;

    assert_eq!(response.status_code(), 307);
    let location = response.header("location");
    // Unsigned test backend: same object URL plus an expiry marker, using
    // the state's presign TTL.
    assert_eq!(
        location,
        format!("{}?expires=604800", common::object_url("report.pdf")).as_str()
    );
}

/// Without a stored credential the stored target is served untouched, even
/// when it points into the bucket.
#[tokio::test]
async fn test_redirect_object_target_without_credential() {
    let state = common::create_test_state();
    let server = redirect_app(state.clone());

    let target = common::object_url("report.pdf");
    common::seed_token(&state, "report", &target).await;

    let response = server.get("/report").await;

    assert_eq!(response.status_code(), 307);
    let location = response.header("location");
    assert_eq!(location, target.as_str());
}

/// Redirects keep working when object storage is not configured at all.
#[tokio::test]
async fn test_redirect_without_storage() {
    let state = common::create_test_state_without_storage();
    let server = redirect_app(state.clone());

    common::seed_token(&state, "plain1", "https://example.com/a").await;

    let response = server.get("/plain1").await;

    assert_eq!(response.status_code(), 307);
    assert_eq!(response.header("location"), "https://example.com/a");
}
