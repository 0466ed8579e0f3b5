use super::*;
use anyhow::anyhow;
use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use shared::protocol::Itinerary;
use std::time::Duration;
use tokio::{net::TcpListener, sync::Mutex};

struct ScriptedAssistant {
    response: Option<AssistantResponse>,
    requests: Arc<Mutex<Vec<AssistantRequest>>>,
}

impl ScriptedAssistant {
    fn replying(reply: &str) -> Self {
        Self {
            response: Some(AssistantResponse {
                reply: Some(reply.to_string()),
                itineraries: Some(vec![Itinerary {
                    id: "goa-weekend".into(),
                    ..Itinerary::default()
                }]),
                error: None,
            }),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self {
            response: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AssistantService for ScriptedAssistant {
    async fn respond(&self, request: &AssistantRequest) -> anyhow::Result<AssistantResponse> {
        self.requests.lock().await.push(request.clone());
        self.response
            .clone()
            .ok_or_else(|| anyhow!("connection refused"))
    }
}

async fn setup() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    ApiContext::new(storage, UserId::new("12345"))
}

#[tokio::test]
async fn send_chat_without_assistant_stores_only_user_record() {
    let ctx = setup().await;
    let user = ctx.default_user.clone();

    let response = send_chat(&ctx, &user, "Plan a trip to Goa")
        .await
        .expect("send");
    assert!(response.ok);
    assert!(response.message.is_none());
    assert!(response.itineraries.is_none());
    let chat = response.chat.expect("chat record");
    assert_eq!(chat.sender, Sender::User);
    assert_eq!(chat.message, "Plan a trip to Goa");

    let chats = list_chats(&ctx, &user).await.expect("list");
    assert_eq!(chats.len(), 1);
}

#[tokio::test]
async fn send_chat_rejects_blank_message() {
    let ctx = setup().await;
    let err = send_chat(&ctx, &ctx.default_user, "   ")
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(list_chats(&ctx, &ctx.default_user)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn send_chat_forwards_latest_preferences_and_stores_reply() {
    let assistant = Arc::new(ScriptedAssistant::replying("Here are your options"));
    let ctx = setup().await.with_assistant(assistant.clone());
    let user = UserId::new("traveller");

    save_preferences(&ctx, &user, &serde_json::json!({ "budget": "under-25k" }))
        .await
        .expect("older prefs");
    save_preferences(&ctx, &user, &serde_json::json!({ "budget": "25k-50k" }))
        .await
        .expect("newer prefs");

    let response = send_chat(&ctx, &user, "Plan a trip to Goa")
        .await
        .expect("send");
    assert_eq!(response.message.as_deref(), Some("Here are your options"));
    assert_eq!(response.itineraries.expect("itineraries")[0].id, "goa-weekend");

    let requests = assistant.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_query, "Plan a trip to Goa");
    assert_eq!(requests[0].user_meta.user_id, user);
    assert_eq!(
        requests[0].user_meta.preferences,
        Some(serde_json::json!({ "budget": "25k-50k" }))
    );

    let chats = list_chats(&ctx, &user).await.expect("list");
    assert_eq!(
        chats.iter().map(|c| c.sender).collect::<Vec<_>>(),
        vec![Sender::User, Sender::Ai]
    );
}

#[tokio::test]
async fn assistant_failure_still_succeeds_without_reply() {
    let ctx = setup()
        .await
        .with_assistant(Arc::new(ScriptedAssistant::failing()));
    let user = ctx.default_user.clone();

    let response = send_chat(&ctx, &user, "hello").await.expect("send");
    assert!(response.ok);
    assert!(response.message.is_none());
    assert_eq!(list_chats(&ctx, &user).await.expect("list").len(), 1);
}

#[tokio::test]
async fn save_preferences_stores_null_document_as_is() {
    let ctx = setup().await;
    let saved = save_preferences(&ctx, &ctx.default_user, &serde_json::Value::Null)
        .await
        .expect("save");
    assert!(saved.ok);
    assert!(saved.pref.expect("pref").preferences.is_null());

    let listed = list_preferences(&ctx, &ctx.default_user)
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert!(listed[0].preferences.is_null());
}

#[tokio::test]
async fn resolve_user_falls_back_to_default() {
    let ctx = setup().await;
    assert_eq!(ctx.resolve_user(None), UserId::new("12345"));
    assert_eq!(ctx.resolve_user(Some(UserId::new(" "))), UserId::new("12345"));
    assert_eq!(ctx.resolve_user(Some(UserId::new("bob"))), UserId::new("bob"));
}

#[tokio::test]
async fn http_assistant_posts_query_and_decodes_reply() {
    async fn respond(Json(request): Json<AssistantRequest>) -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "reply": format!("echo: {}", request.user_query),
            "itineraries": [{ "id": "x" }]
        }))
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, Router::new().route("/response", post(respond)))
            .await
            .expect("serve");
    });

    let assistant = HttpAssistant::new(
        &format!("http://{addr}/response"),
        Duration::from_secs(5),
    )
    .expect("assistant");
    let response = assistant
        .respond(&AssistantRequest {
            user_id: UserId::new("12345"),
            user_query: "Goa".into(),
            user_meta: AssistantUserMeta {
                user_id: UserId::new("12345"),
                preferences: None,
            },
        })
        .await
        .expect("respond");
    assert_eq!(response.reply.as_deref(), Some("echo: Goa"));
    assert_eq!(response.itineraries.expect("itineraries").len(), 1);
}

#[test]
fn http_assistant_rejects_invalid_endpoint() {
    assert!(HttpAssistant::new("not a url", Duration::from_secs(1)).is_err());
}
