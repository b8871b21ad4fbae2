//! Thin HTTP client for a running memagent server

use anyhow::{anyhow, bail, Context, Result};
use memagent_api::schemas::{
    ChatRequest, ChatResponse, ClearResponse, ConversationHistoryResponse, HealthResponse,
    ToolsResponse,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/conversation/{thread_id}` with the id as one encoded segment
    fn conversation_url(&self, thread_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url("/conversation"))
            .with_context(|| format!("Invalid server URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid server URL {}", self.base_url))?
            .push(thread_id);
        Ok(url)
    }

    /// Decode a success body, or turn `{"detail": ...}` into an error
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await.context("Failed to read response body")?;

        if !status.is_success() {
            let detail = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["detail"].as_str().map(str::to_string))
                .unwrap_or(text);
            bail!("HTTP {}: {}", status.as_u16(), detail);
        }

        serde_json::from_str(&text).context("Unexpected response shape")
    }

    async fn get<T: DeserializeOwned>(&self, url: impl reqwest::IntoUrl) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.base_url))?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get(self.url("/health")).await
    }

    pub async fn tools(&self) -> Result<ToolsResponse> {
        self.get(self.url("/tools")).await
    }

    pub async fn chat(&self, message: &str, thread_id: &str) -> Result<ChatResponse> {
        let request = ChatRequest {
            message: message.to_string(),
            thread_id: thread_id.to_string(),
        };
        let response = self
            .client
            .post(self.url("/chat"))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.base_url))?;
        Self::decode(response).await
    }

    pub async fn history(&self, thread_id: &str) -> Result<ConversationHistoryResponse> {
        self.get(self.conversation_url(thread_id)?).await
    }

    pub async fn clear(&self, thread_id: &str) -> Result<ClearResponse> {
        let response = self
            .client
            .delete(self.conversation_url(thread_id)?)
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.base_url))?;
        Self::decode(response).await
    }
}
