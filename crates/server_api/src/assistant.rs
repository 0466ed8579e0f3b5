use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::{AssistantRequest, AssistantResponse};
use url::Url;

/// Upstream service that turns a user query into a reply and optional itineraries.
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn respond(&self, request: &AssistantRequest) -> Result<AssistantResponse>;
}

/// Used when no assistant endpoint is configured: never replies.
pub struct DisabledAssistant;

#[async_trait]
impl AssistantService for DisabledAssistant {
    async fn respond(&self, _request: &AssistantRequest) -> Result<AssistantResponse> {
        Ok(AssistantResponse::default())
    }
}

pub struct HttpAssistant {
    http: Client,
    endpoint: Url,
}

impl HttpAssistant {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("invalid assistant endpoint '{endpoint}'"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build assistant http client")?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AssistantService for HttpAssistant {
    async fn respond(&self, request: &AssistantRequest) -> Result<AssistantResponse> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .with_context(|| format!("assistant request to {} failed", self.endpoint))?
            .error_for_status()?;
        let body = response
            .json::<AssistantResponse>()
            .await
            .context("assistant response was not valid JSON")?;
        Ok(body)
    }
}
