//! KeyProbe — Discord bot that checks OpenAI API keys.
//!
//! `serve` (the default) answers signed interaction webhooks;
//! `register` uploads the slash-command schema and exits.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use keyprobe::auth::Ed25519Verifier;
use keyprobe::commands;
use keyprobe::config::{Cli, Command, Settings};
use keyprobe::discord::rest::DiscordClient;
use keyprobe::followup::FollowUpNotifier;
use keyprobe::logger;
use keyprobe::prober::KeyProber;
use keyprobe::provider::openai::OpenAIAdapter;
use keyprobe::provider::ProviderApi;
use keyprobe::router::{InteractionRouter, TierSettings};
use keyprobe::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logger::init(cli.settings.log_format)?;
    cli.settings.validate()?;

    info!("🔑 KeyProbe v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli.settings).await,
        Command::Register => register(&cli.settings).await,
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    let client_id = settings.require_client_id()?;
    let bot_token = settings.require_bot_token()?;
    let verifier = Ed25519Verifier::from_hex(settings.require_public_key()?)
        .context("Failed to load DISCORD_PUBLIC_KEY")?;

    // ── Provider & Prober ───────────────────────────────────────────
    let provider = OpenAIAdapter::new(
        &settings.provider_base_url,
        &settings.probe_model,
        settings.probe_timeout(),
    )?;
    info!("  📡 Provider: {} at {}", provider.provider_id(), settings.provider_base_url);
    let prober = Arc::new(KeyProber::new(Arc::new(provider)));

    // ── Discord ─────────────────────────────────────────────────────
    let discord = Arc::new(DiscordClient::new(&settings.discord_api_base, bot_token)?);
    let tier = TierSettings::new(&settings.premium_model);
    info!("  ⭐ Premium tier: {} (probe model {})", tier.label, settings.probe_model);
    let notifier = FollowUpNotifier::new(Arc::clone(&prober), discord, &tier.model, &tier.label);
    let router = InteractionRouter::new(prober, notifier, tier);

    let state = AppState {
        router: Arc::new(router),
        verifier: Arc::new(verifier),
        client_id: Arc::from(client_id),
        deadline: settings.request_timeout(),
    };
    info!(
        "  ⏱  Interaction deadline: {}s (per provider call: {}s)",
        settings.request_timeout_secs, settings.probe_timeout_secs
    );

    server::serve(settings.bind, state).await
}

async fn register(settings: &Settings) -> Result<()> {
    let client_id = settings.require_client_id()?;
    let discord = DiscordClient::new(&settings.discord_api_base, settings.require_bot_token()?)?;
    let count = discord
        .register_commands(client_id, &commands::definitions())
        .await
        .context("Failed to register commands")?;
    info!("✅ Registered {} commands for application {}", count, client_id);
    Ok(())
}
