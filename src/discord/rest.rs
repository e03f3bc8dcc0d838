//! Discord REST client — out-of-band messages and command registration.
//!
//! Authenticated with the bot's own token, never with a user-supplied
//! credential.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info};

use super::response::MessageData;
use crate::commands::CommandSpec;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const REST_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates messages in a channel. The follow-up notifier's only way out.
#[async_trait]
pub trait MessagePoster: Send + Sync {
    async fn create_message(&self, channel_id: &str, message: &MessageData) -> Result<()>;
}

pub struct DiscordClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl DiscordClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REST_TIMEOUT)
            .build()
            .context("Failed to build Discord HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Bulk-overwrite the application's global commands.
    pub async fn register_commands(
        &self,
        application_id: &str,
        commands: &[CommandSpec],
    ) -> Result<usize> {
        let url = format!("{}/applications/{}/commands", self.api_base, application_id);
        let resp = self
            .client
            .put(&url)
            .header(AUTHORIZATION, self.authorization())
            .json(commands)
            .send()
            .await
            .context("Failed to reach Discord")?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord command registration failed ({}): {}", status, excerpt(&body));
        }

        let registered: Vec<serde_json::Value> = resp
            .json()
            .await
            .context("Discord returned an unreadable command list")?;
        info!(count = registered.len(), "Slash commands registered");
        Ok(registered.len())
    }
}

#[async_trait]
impl MessagePoster for DiscordClient {
    async fn create_message(&self, channel_id: &str, message: &MessageData) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.authorization())
            .json(message)
            .send()
            .await
            .context("Failed to reach Discord")?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord create message failed ({}): {}", status, excerpt(&body));
        }
        debug!(channel_id, "Follow-up message posted");
        Ok(())
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(500).collect()
}
