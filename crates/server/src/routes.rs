use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use server_api::{list_chats, list_preferences, save_preferences, send_chat};
use shared::{
    domain::UserId,
    error::{ApiError, ErrorCode},
    protocol::{
        ChatRecord, HealthResponse, PreferenceRecord, SavePreferencesRequest,
        SavePreferencesResponse, SendChatRequest, SendChatResponse,
    },
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::error;

use crate::app_state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: Option<UserId>,
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", get(http_list_chats).post(http_send_chat))
        .route(
            "/api/preferences",
            get(http_list_preferences).post(http_save_preferences),
        )
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(server_api::health())
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": format!("Route {uri} not found") })),
    )
}

async fn http_send_chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SendChatRequest>, JsonRejection>,
) -> ApiResult<SendChatResponse> {
    let Json(req) = body.map_err(|e| reject_body(&state, e))?;
    let user_id = state.api.resolve_user(req.user_id);
    let response = send_chat(&state.api, &user_id, &req.message)
        .await
        .map_err(|e| reject(&state, e))?;
    Ok(Json(response))
}

async fn http_list_chats(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Vec<ChatRecord>> {
    let user_id = state.api.resolve_user(q.user_id);
    let chats = list_chats(&state.api, &user_id)
        .await
        .map_err(|e| reject(&state, e))?;
    Ok(Json(chats))
}

async fn http_save_preferences(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SavePreferencesRequest>, JsonRejection>,
) -> ApiResult<SavePreferencesResponse> {
    let Json(req) = body.map_err(|e| reject_body(&state, e))?;
    let user_id = state.api.resolve_user(req.user_id);
    let response = save_preferences(&state.api, &user_id, &req.preferences)
        .await
        .map_err(|e| reject(&state, e))?;
    Ok(Json(response))
}

async fn http_list_preferences(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Vec<PreferenceRecord>> {
    let user_id = state.api.resolve_user(q.user_id);
    let prefs = list_preferences(&state.api, &user_id)
        .await
        .map_err(|e| reject(&state, e))?;
    Ok(Json(prefs))
}

fn reject(state: &AppState, err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(
            detail = err.error.as_deref().unwrap_or_default(),
            "request failed"
        );
    }
    (status, Json(err.redacted(state.expose_error_detail)))
}

fn reject_body(state: &AppState, rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    reject(
        state,
        ApiError::new(ErrorCode::Validation, rejection.body_text()),
    )
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
