//! Command-line and environment configuration.
//!
//! Every setting can come from a flag or from the environment; a `.env`
//! file in the working directory is loaded before parsing.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::discord::rest::DEFAULT_API_BASE;
use crate::provider::openai::DEFAULT_BASE_URL;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the interactions webhook (default)
    Serve,
    /// Upload the slash-command schema to Discord
    Register,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Discord application (client) id
    #[arg(long, env = "DISCORD_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Bot token used for out-of-band messages and registration
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, global = true)]
    pub bot_token: Option<String>,

    /// Hex Ed25519 public key that signs incoming interactions
    #[arg(long, env = "DISCORD_PUBLIC_KEY", global = true)]
    pub public_key: Option<String>,

    #[arg(long, env = "KEYPROBE_BIND", default_value = "0.0.0.0:8787", global = true)]
    pub bind: SocketAddr,

    #[arg(long, env = "PROVIDER_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub provider_base_url: String,

    #[arg(long, env = "DISCORD_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    pub discord_api_base: String,

    /// Model id whose presence marks premium-tier access
    #[arg(long, env = "PREMIUM_MODEL", default_value = "gpt-4", global = true)]
    pub premium_model: String,

    /// Model named in the (deliberately incomplete) inference probe
    #[arg(long, env = "PROBE_MODEL", default_value = "gpt-3.5-turbo", global = true)]
    pub probe_model: String,

    /// Deadline for handling one interaction, probes included
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 25, global = true)]
    pub request_timeout_secs: u64,

    /// Timeout for one provider call; must be below the request deadline
    #[arg(long, env = "PROBE_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub probe_timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// A probe that may outlive the request deadline would turn one slow
    /// key into a 500 for the whole batch.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.probe_timeout_secs > 0 && self.probe_timeout_secs < self.request_timeout_secs,
            "PROBE_TIMEOUT_SECS ({}) must be between 1 and REQUEST_TIMEOUT_SECS ({})",
            self.probe_timeout_secs,
            self.request_timeout_secs
        );
        Ok(())
    }

    pub fn require_client_id(&self) -> anyhow::Result<&str> {
        self.client_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DISCORD_CLIENT_ID is not set"))
    }

    pub fn require_bot_token(&self) -> anyhow::Result<&str> {
        self.bot_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DISCORD_TOKEN is not set"))
    }

    pub fn require_public_key(&self) -> anyhow::Result<&str> {
        self.public_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DISCORD_PUBLIC_KEY is not set"))
    }
}
