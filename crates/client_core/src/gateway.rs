use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Preferences, UserId},
    error::ApiError,
    protocol::{
        Itinerary, SavePreferencesRequest, SavePreferencesResponse, SendChatRequest,
        SendChatResponse,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub reply_text: Option<String>,
    pub itineraries: Option<Vec<Itinerary>>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("server rejected the request")]
    Rejected,
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("no backend configured")]
    Unavailable,
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Status { .. } => "status",
            GatewayError::Rejected => "rejected",
            GatewayError::Decode(_) => "decode",
            GatewayError::Unavailable => "unavailable",
        }
    }
}

/// Network boundary used by the coordinator. Calls are single-shot.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn submit_preferences(
        &self,
        user_id: &UserId,
        preferences: &Preferences,
    ) -> Result<(), GatewayError>;

    async fn submit_chat(&self, user_id: &UserId, text: &str) -> Result<ChatReply, GatewayError>;
}

pub struct MissingGateway;

#[async_trait]
impl RemoteGateway for MissingGateway {
    async fn submit_preferences(
        &self,
        _user_id: &UserId,
        _preferences: &Preferences,
    ) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn submit_chat(&self, _user_id: &UserId, _text: &str) -> Result<ChatReply, GatewayError> {
        Err(GatewayError::Unavailable)
    }
}

/// Talks to the itinerary service's `/api/preferences` and `/api/chat` routes.
pub struct HttpGateway {
    http: Client,
    base_url: Url,
}

impl HttpGateway {
    /// `timeout` bounds each whole request, so a hung backend surfaces as a
    /// [`GatewayError::Transport`] instead of a call that never returns.
    pub fn new(server_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base_url =
            Url::parse(server_url).with_context(|| format!("invalid server url '{server_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build gateway http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::Transport(err.to_string()))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "posting to backend");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport_error)?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ApiError>(&bytes)
            .map(|err| err.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(GatewayError::Status {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        warn!(kind = "timeout", error = %err, "backend did not answer in time");
    }
    GatewayError::Transport(err.to_string())
}

fn log_failure<T>(operation: &str, result: Result<T, GatewayError>) -> Result<T, GatewayError> {
    if let Err(err) = &result {
        warn!(operation, kind = err.kind(), error = %err, "gateway call failed");
    }
    result
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn submit_preferences(
        &self,
        user_id: &UserId,
        preferences: &Preferences,
    ) -> Result<(), GatewayError> {
        let result: Result<(), GatewayError> = async {
            let request = SavePreferencesRequest {
                preferences: serde_json::to_value(preferences)
                    .map_err(|err| GatewayError::Decode(err.to_string()))?,
                user_id: Some(user_id.clone()),
            };
            let response: SavePreferencesResponse =
                self.post_json("api/preferences", &request).await?;
            if response.ok {
                Ok(())
            } else {
                Err(GatewayError::Rejected)
            }
        }
        .await;
        log_failure("submit_preferences", result)
    }

    async fn submit_chat(&self, user_id: &UserId, text: &str) -> Result<ChatReply, GatewayError> {
        let result: Result<ChatReply, GatewayError> = async {
            let request = SendChatRequest {
                message: text.to_string(),
                user_id: Some(user_id.clone()),
            };
            let response: SendChatResponse = self.post_json("api/chat", &request).await?;
            if !response.ok {
                return Err(GatewayError::Rejected);
            }
            Ok(ChatReply {
                reply_text: response.message,
                itineraries: response.itineraries,
            })
        }
        .await;
        log_failure("submit_chat", result)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
