//! OpenAI adapter.
//!
//! Every call carries its own timeout, so a stalled connection becomes a
//! [`TransportError`] for that credential instead of holding up the
//! whole interaction.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{parse_reply, CompletionReply, ModelList, ProviderApi, ProviderReply, TransportError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIAdapter {
    client: reqwest::Client,
    base_url: String,
    probe_model: String,
}

impl OpenAIAdapter {
    pub fn new(base_url: &str, probe_model: &str, call_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .context("Failed to build provider HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            probe_model: probe_model.to_string(),
        })
    }

    async fn read_reply<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<ProviderReply<T>, TransportError> {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(parse_reply(status, &body))
    }
}

#[async_trait]
impl ProviderApi for OpenAIAdapter {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn list_models(&self, key: &str) -> Result<ProviderReply<ModelList>, TransportError> {
        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::read_reply(resp).await
    }

    async fn probe_completion(&self, key: &str) -> Result<CompletionReply, TransportError> {
        // No `messages`: an authenticated key gets invalid_request_error,
        // an unfunded one gets insufficient_quota. Nothing is generated.
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&serde_json::json!({ "model": &self.probe_model }))
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::read_reply(resp).await
    }
}
