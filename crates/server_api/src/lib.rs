use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{Sender, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        AssistantRequest, AssistantResponse, AssistantUserMeta, ChatRecord, HealthResponse,
        PreferenceRecord, SavePreferencesResponse, SendChatResponse,
    },
};
use storage::Storage;
use tracing::{info, warn};

mod assistant;

pub use assistant::{AssistantService, DisabledAssistant, HttpAssistant};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub assistant: Arc<dyn AssistantService>,
    /// Owner of records when a request does not name a user.
    pub default_user: UserId,
}

impl ApiContext {
    pub fn new(storage: Storage, default_user: UserId) -> Self {
        Self {
            storage,
            assistant: Arc::new(DisabledAssistant),
            default_user,
        }
    }

    pub fn with_assistant(mut self, assistant: Arc<dyn AssistantService>) -> Self {
        self.assistant = assistant;
        self
    }

    pub fn resolve_user(&self, requested: Option<UserId>) -> UserId {
        requested
            .filter(|user| !user.as_str().trim().is_empty())
            .unwrap_or_else(|| self.default_user.clone())
    }
}

pub fn health() -> HealthResponse {
    HealthResponse {
        message: "Itinerary service is healthy".into(),
        timestamp: Utc::now(),
    }
}

/// Persists the user's message, forwards it to the assistant and persists any reply.
///
/// Assistant failures never fail the request; the response simply carries no reply.
pub async fn send_chat(
    ctx: &ApiContext,
    user_id: &UserId,
    message: &str,
) -> Result<SendChatResponse, ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "message must not be empty",
        ));
    }

    let chat = ctx
        .storage
        .insert_chat(user_id, message, Sender::User)
        .await
        .map_err(internal)?;

    let preferences = match ctx.storage.latest_preferences(user_id).await {
        Ok(record) => record.map(|record| record.preferences),
        Err(error) => {
            warn!(%user_id, error = %format!("{error:#}"), "failed to load preferences for assistant query");
            None
        }
    };
    let request = AssistantRequest {
        user_id: user_id.clone(),
        user_query: message.to_string(),
        user_meta: AssistantUserMeta {
            user_id: user_id.clone(),
            preferences,
        },
    };

    let response = match ctx.assistant.respond(&request).await {
        Ok(response) => response,
        Err(error) => {
            warn!(%user_id, error = %format!("{error:#}"), "assistant call failed");
            AssistantResponse::default()
        }
    };
    if let Some(error) = response.error.as_deref() {
        warn!(%user_id, %error, "assistant reported an error");
    }

    let reply = response.reply.filter(|reply| !reply.trim().is_empty());
    if let Some(reply) = reply.as_deref() {
        let stored = ctx
            .storage
            .insert_chat(user_id, reply, Sender::Ai)
            .await
            .map_err(internal)?;
        info!(%user_id, chat_id = stored.id.0, "stored assistant reply");
    }

    Ok(SendChatResponse {
        ok: true,
        chat: Some(chat),
        message: reply,
        itineraries: response.itineraries,
    })
}

pub async fn list_chats(ctx: &ApiContext, user_id: &UserId) -> Result<Vec<ChatRecord>, ApiError> {
    ctx.storage.list_chats(user_id).await.map_err(internal)
}

pub async fn save_preferences(
    ctx: &ApiContext,
    user_id: &UserId,
    preferences: &serde_json::Value,
) -> Result<SavePreferencesResponse, ApiError> {
    let pref = ctx
        .storage
        .insert_preferences(user_id, preferences)
        .await
        .map_err(internal)?;
    info!(%user_id, preference_id = pref.id.0, "stored preferences");
    Ok(SavePreferencesResponse {
        ok: true,
        pref: Some(pref),
    })
}

pub async fn list_preferences(
    ctx: &ApiContext,
    user_id: &UserId,
) -> Result<Vec<PreferenceRecord>, ApiError> {
    ctx.storage.list_preferences(user_id).await.map_err(internal)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
