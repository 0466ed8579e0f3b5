use super::*;
use axum::{body, body::Body, http::Request, response::Response};
use serde_json::Value;
use server_api::ApiContext;
use storage::Storage;
use tower::ServiceExt;

async fn test_app(expose_error_detail: bool) -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext::new(storage.clone(), UserId::new("12345"));
    let app = build_router(Arc::new(AppState {
        api,
        expose_error_detail,
    }));
    (app, storage)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn health_reports_message_and_timestamp() {
    let (app, _storage) = test_app(true).await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Itinerary service is healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_not_found_message() {
    let (app, _storage) = test_app(true).await;
    let response = app
        .oneshot(
            Request::get("/api/flights")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["message"],
        "Route /api/flights not found"
    );
}

#[tokio::test]
async fn chat_is_stored_under_default_user_and_listed() {
    let (app, _storage) = test_app(true).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/chat",
            serde_json::json!({ "message": "Plan a trip to Goa" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let sent = json_body(response).await;
    assert_eq!(sent["ok"], true);
    assert_eq!(sent["chat"]["message"], "Plan a trip to Goa");
    assert_eq!(sent["chat"]["sender"], "user");
    assert_eq!(sent["chat"]["user_id"], "12345");

    let response = app
        .clone()
        .oneshot(Request::get("/api/chat").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let chats = json_body(response).await;
    assert_eq!(chats.as_array().expect("array").len(), 1);

    let response = app
        .oneshot(
            Request::get("/api/chat?user_id=someone-else")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert!(json_body(response).await.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn blank_chat_message_is_a_validation_error() {
    let (app, _storage) = test_app(true).await;
    let response = app
        .oneshot(post_json("/api/chat", serde_json::json!({ "message": "  " })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let (app, _storage) = test_app(true).await;
    let request = Request::post("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "validation");
}

#[tokio::test]
async fn preferences_are_saved_opaquely_and_listed_newest_first() {
    let (app, _storage) = test_app(true).await;

    for budget in ["under-25k", "50k-100k"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/preferences",
                serde_json::json!({
                    "user_id": "traveller",
                    "preferences": { "budget": budget, "extra": [1, 2] }
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let saved = json_body(response).await;
        assert_eq!(saved["ok"], true);
        assert_eq!(saved["pref"]["preferences"]["budget"], budget);
    }

    let response = app
        .oneshot(
            Request::get("/api/preferences?user_id=traveller")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let prefs = json_body(response).await;
    let prefs = prefs.as_array().expect("array");
    assert_eq!(prefs.len(), 2);
    assert_eq!(prefs[0]["preferences"]["budget"], "50k-100k");
    assert_eq!(prefs[0]["preferences"]["extra"], serde_json::json!([1, 2]));
}

#[tokio::test]
async fn missing_preferences_are_stored_as_null() {
    let (app, _storage) = test_app(true).await;
    let response = app
        .oneshot(post_json("/api/preferences", serde_json::json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["ok"], true);
    assert!(saved["pref"]["preferences"].is_null());
}

#[tokio::test]
async fn internal_error_detail_is_hidden_outside_development() {
    let (app, storage) = test_app(false).await;
    storage.pool().close().await;

    let response = app
        .oneshot(Request::get("/api/chat").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Internal Server Error");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn internal_error_detail_is_echoed_in_development() {
    let (app, storage) = test_app(true).await;
    storage.pool().close().await;

    let response = app
        .oneshot(Request::get("/api/preferences").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"].is_string());
}
