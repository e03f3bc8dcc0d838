//! Interaction router — one verified interaction in, one reply out.
//!
//! Every branch is terminal: nothing is remembered between invocations.
//! The only carried state is the batch report embedded in a message,
//! which a later button click decodes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::{self, BatchInputError};
use crate::commands::{CommandName, ComponentId, BATCH_KEY_LEN};
use crate::discord::interaction::{CommandInvocation, ComponentClick, Interaction};
use crate::discord::response::{
    ActionRow, Embed, EmbedField, EmbedFooter, InteractionResponse, MessageData, COLOR_GREEN,
    COLOR_RED,
};
use crate::followup::{FollowUpNotifier, FollowUpTarget};
use crate::prober::{obfuscate_key, KeyProber, ProbeResult, ProbeStatus};

pub const PONG: &str = "Pong!";

/// What the webhook answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Interaction(InteractionResponse),
    /// Defined, non-fatal answer to anything the router does not handle.
    Unrecognized,
}

/// The premium model family a key is checked against.
#[derive(Debug, Clone)]
pub struct TierSettings {
    pub model: String,
    pub label: String,
}

impl TierSettings {
    /// Label is the model id upper-cased: `gpt-4` → `GPT-4`.
    pub fn new(model: &str) -> Self {
        Self { model: model.to_string(), label: model.to_uppercase() }
    }
}

pub struct InteractionRouter {
    prober: Arc<KeyProber>,
    notifier: Arc<FollowUpNotifier>,
    tier: TierSettings,
}

impl InteractionRouter {
    pub fn new(prober: Arc<KeyProber>, notifier: FollowUpNotifier, tier: TierSettings) -> Self {
        Self { prober, notifier: Arc::new(notifier), tier }
    }

    pub async fn route(&self, interaction: Interaction) -> Reply {
        match interaction {
            Interaction::Handshake => {
                debug!("Handshake");
                Reply::Interaction(InteractionResponse::pong())
            }
            Interaction::Command(invocation) => {
                info!(command = invocation.command.as_str(), "Handling command");
                let response = match invocation.command {
                    CommandName::Ping => ephemeral_text(PONG),
                    CommandName::Check => self.handle_check(&invocation).await,
                    CommandName::BatchCheck => self.handle_batch(&invocation).await,
                };
                Reply::Interaction(response)
            }
            Interaction::ComponentClick(click) => {
                info!(
                    component = click.component.as_str(),
                    message_id = %click.message.id,
                    "Handling click"
                );
                let response = match click.component {
                    ComponentId::TierCheck => self.handle_tier_check(&click),
                };
                Reply::Interaction(response)
            }
            Interaction::Unrecognized(what) => {
                info!(what = %what, "Unrecognized interaction");
                Reply::Unrecognized
            }
        }
    }

    async fn handle_check(&self, invocation: &CommandInvocation) -> InteractionResponse {
        let ephemeral = invocation.first_bool().unwrap_or(false);
        let credential = match invocation.first_string() {
            Some(c) if !c.trim().is_empty() => c.trim(),
            _ => {
                return ephemeral_text("A key is required.");
            }
        };

        let result = self.prober.probe(credential).await;
        info!(key = %obfuscate_key(credential), status = result.status.label(), "Check complete");
        InteractionResponse::message(render_check(&result, &self.tier, ephemeral))
    }

    async fn handle_batch(&self, invocation: &CommandInvocation) -> InteractionResponse {
        let credentials = codec::split_batch(invocation.first_string().unwrap_or_default());
        if let Err(e) = codec::validate_batch(&credentials, BATCH_KEY_LEN) {
            warn!(keys = credentials.len(), "Batch rejected: {}", e);
            return ephemeral_text(render_batch_rejection(&e));
        }

        let results = self.prober.probe_batch(&credentials).await;
        let available = results.iter().filter(|r| r.status.is_valid()).count();
        info!(keys = results.len(), available, "Batch check complete");

        let report = codec::encode(&results);
        let message = MessageData {
            embeds: vec![Embed {
                description: Some(report.body),
                footer: Some(EmbedFooter { text: report.bitmap }),
                ..Default::default()
            }],
            components: Some(vec![ActionRow::single_button(
                format!("Check {}", self.tier.label),
                ComponentId::TierCheck.as_str(),
            )]),
            ..Default::default()
        };
        InteractionResponse::message(message)
    }

    fn handle_tier_check(&self, click: &ComponentClick) -> InteractionResponse {
        let entries = codec::decode(
            click.message.first_description(),
            click.message.first_footer(),
            BATCH_KEY_LEN,
        )
        .unwrap_or_else(|e| {
            warn!(message_id = %click.message.id, "No usable report on clicked message: {}", e);
            Vec::new()
        });

        let available = codec::available_credentials(&entries);
        if available.is_empty() {
            info!(message_id = %click.message.id, "No available keys to re-check");
        } else {
            // The button is cleared now; the result arrives as its own message.
            let target = FollowUpTarget {
                channel_id: click.channel_id.clone(),
                message_id: click.message.id.clone(),
            };
            self.notifier.spawn_recheck(target, available);
        }

        InteractionResponse::update(MessageData::clear_components())
    }
}

// ── Rendering ───────────────────────────────────────────────────────

pub fn render_check(result: &ProbeResult, tier: &TierSettings, ephemeral: bool) -> MessageData {
    let message = match &result.status {
        ProbeStatus::InvalidCredential => {
            let text = "Incorrect API Key provided - Maybe revoked";
            MessageData::embed(Embed::colored(COLOR_RED, text))
        }
        ProbeStatus::OtherError(reason) => {
            MessageData::embed(Embed::colored(COLOR_RED, format!("Unexpected Error - {}", reason)))
        }
        ProbeStatus::QuotaExceeded => {
            MessageData::embed(Embed::colored(COLOR_RED, "Exceeded current quota - No money"))
        }
        ProbeStatus::RateLimited => MessageData::text("429: Please try again."),
        ProbeStatus::Valid => {
            let usable: Vec<&str> = result
                .models
                .iter()
                .map(String::as_str)
                .filter(|m| m.starts_with("gpt"))
                .collect();
            let indicator = if result.has_tier(&tier.model) { "🟢" } else { "🔴" };
            MessageData::embed(Embed {
                fields: vec![
                    EmbedField { name: tier.label.clone(), value: indicator.into(), inline: true },
                    EmbedField {
                        name: "Usable models".into(),
                        value: if usable.is_empty() { "None".into() } else { usable.join(",") },
                        inline: true,
                    },
                ],
                ..Embed::colored(COLOR_GREEN, "Available")
            })
        }
    };
    message.ephemeral(ephemeral)
}

fn ephemeral_text(content: impl Into<String>) -> InteractionResponse {
    InteractionResponse::message(MessageData::text(content).ephemeral(true))
}

fn render_batch_rejection(err: &BatchInputError) -> String {
    match err {
        BatchInputError::Empty => "No keys found. Separate keys with commas or newlines.".into(),
        BatchInputError::LengthMismatch { expected, offending } => format!(
            "Every key must be exactly {} characters. Rejected: {}",
            expected,
            offending.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::interaction::{CommandOption, HostMessage};
    use crate::discord::response::{
        FLAG_EPHEMERAL, RESPONSE_CHANNEL_MESSAGE, RESPONSE_UPDATE_MESSAGE,
    };
    use crate::test_support::{key, wait_for, FakePoster, FakeProvider, KeyBehavior};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        router: InteractionRouter,
        provider: Arc<FakeProvider>,
        poster: Arc<FakePoster>,
    }

    fn harness(provider: FakeProvider) -> Harness {
        let provider = Arc::new(provider);
        let poster = Arc::new(FakePoster::new());
        let prober = Arc::new(KeyProber::new(provider.clone()));
        let tier = TierSettings::new("gpt-4");
        let notifier =
            FollowUpNotifier::new(Arc::clone(&prober), poster.clone(), &tier.model, &tier.label);
        Harness { router: InteractionRouter::new(prober, notifier, tier), provider, poster }
    }

    fn command(command: CommandName, options: Vec<CommandOption>) -> Interaction {
        Interaction::Command(CommandInvocation { command, options })
    }

    fn string_opt(name: &str, value: &str) -> CommandOption {
        CommandOption::String { name: name.into(), value: value.into() }
    }

    fn check(credential: &str) -> Interaction {
        command(CommandName::Check, vec![string_opt("key", credential)])
    }

    fn batch(raw: &str) -> Interaction {
        command(CommandName::BatchCheck, vec![string_opt("keys", raw)])
    }

    fn response(reply: Reply) -> InteractionResponse {
        match reply {
            Reply::Interaction(r) => r,
            Reply::Unrecognized => panic!("expected an interaction response"),
        }
    }

    async fn message(router: &InteractionRouter, interaction: Interaction) -> MessageData {
        response(router.route(interaction).await).data.unwrap()
    }

    fn click_on(message: MessageData) -> Interaction {
        Interaction::ComponentClick(ComponentClick {
            component: ComponentId::TierCheck,
            channel_id: "chan".into(),
            message: HostMessage { id: "msg-1".into(), channel_id: None, embeds: message.embeds },
        })
    }

    fn report_of(lines: &[String], bitmap: &str) -> MessageData {
        MessageData::embed(Embed {
            description: Some(lines.join("\n")),
            footer: Some(EmbedFooter { text: bitmap.into() }),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_handshake_and_ping() {
        let h = harness(FakeProvider::new());
        let handshake = response(h.router.route(Interaction::Handshake).await);
        assert_eq!(handshake, InteractionResponse::pong());

        let data = message(&h.router, command(CommandName::Ping, vec![])).await;
        assert_eq!(data.content.as_deref(), Some(PONG));
        assert_eq!(data.flags, Some(FLAG_EPHEMERAL));
        assert_eq!(h.provider.models_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_is_defined_reply() {
        let h = harness(FakeProvider::new());
        let reply = h.router.route(Interaction::Unrecognized("command balance".into())).await;
        assert_eq!(reply, Reply::Unrecognized);
    }

    #[tokio::test]
    async fn test_check_valid_key_with_tier_access() {
        let k = key('v');
        let models = vec!["gpt-4", "gpt-3.5-turbo", "whisper-1"];
        let h = harness(FakeProvider::new().with(&k, KeyBehavior::Valid(models)));
        let ephemeral = CommandOption::Boolean { name: "ephemeral".into(), value: true };

        let resp = response(
            h.router
                .route(command(CommandName::Check, vec![string_opt("key", &k), ephemeral]))
                .await,
        );

        assert_eq!(resp.kind, RESPONSE_CHANNEL_MESSAGE);
        let data = resp.data.unwrap();
        assert_eq!(data.flags, Some(FLAG_EPHEMERAL));
        let embed = &data.embeds[0];
        assert_eq!(embed.description.as_deref(), Some("Available"));
        assert_eq!(embed.color, Some(COLOR_GREEN));
        assert_eq!(embed.fields[0].name, "GPT-4");
        assert_eq!(embed.fields[0].value, "🟢");
        assert_eq!(embed.fields[1].value, "gpt-4,gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_check_valid_key_without_tier() {
        let k = key('w');
        let h = harness(FakeProvider::new().with(&k, KeyBehavior::Valid(vec!["davinci-002"])));

        let data = message(&h.router, check(&k)).await;

        assert_eq!(data.flags, Some(0));
        assert_eq!(data.embeds[0].fields[0].value, "🔴");
        assert_eq!(data.embeds[0].fields[1].value, "None");
    }

    #[tokio::test]
    async fn test_check_invalid_key_fixed_message() {
        let k = key('i');
        let h = harness(FakeProvider::new().with(&k, KeyBehavior::Invalid));

        let data = message(&h.router, check(&k)).await;

        assert_eq!(
            data.embeds[0].description.as_deref(),
            Some("Incorrect API Key provided - Maybe revoked")
        );
        assert_eq!(data.embeds[0].color, Some(COLOR_RED));
    }

    #[tokio::test]
    async fn test_check_is_idempotent() {
        let k = key('v');
        let h = harness(FakeProvider::new().with(&k, KeyBehavior::NoQuota));

        let first = h.router.route(check(&k)).await;
        let second = h.router.route(check(&k)).await;

        assert_eq!(first, second);
        let data = response(first).data.unwrap();
        let description = data.embeds[0].description.as_deref();
        assert_eq!(description, Some("Exceeded current quota - No money"));
    }

    #[tokio::test]
    async fn test_check_without_key_probes_nothing() {
        let h = harness(FakeProvider::new());
        let data = message(&h.router, command(CommandName::Check, vec![])).await;
        assert_eq!(data.flags, Some(FLAG_EPHEMERAL));
        assert_eq!(h.provider.models_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_render_check_rate_limited_and_other() {
        let tier = TierSettings::new("gpt-4");
        let limited = ProbeResult {
            credential: "k".into(),
            status: ProbeStatus::RateLimited,
            models: vec![],
            model_tier: None,
        };
        assert_eq!(
            render_check(&limited, &tier, false).content.as_deref(),
            Some("429: Please try again.")
        );

        let other = ProbeResult { status: ProbeStatus::OtherError("boom".into()), ..limited };
        assert_eq!(
            render_check(&other, &tier, false).embeds[0].description.as_deref(),
            Some("Unexpected Error - boom")
        );
    }

    #[tokio::test]
    async fn test_batch_renders_report_with_button() {
        let (a, b, c) = (key('a'), key('b'), key('c'));
        let h = harness(
            FakeProvider::new()
                .with(&a, KeyBehavior::Valid(vec![]))
                .with(&b, KeyBehavior::Invalid)
                .with(&c, KeyBehavior::Valid(vec![])),
        );

        let data = message(&h.router, batch(&format!("{},{}\\n{}", a, b, c))).await;

        let embed = &data.embeds[0];
        assert_eq!(embed.footer.as_ref().unwrap().text, "101");
        let lines: Vec<&str> = embed.description.as_deref().unwrap().lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], format!("{} - 🔴 Invalid API Key", b));
        let button = &data.components.as_ref().unwrap()[0].components[0];
        assert_eq!(button.custom_id, "tier-check");
        assert_eq!(button.label, "Check GPT-4");
        assert_eq!(h.provider.completion_calls.load(Ordering::SeqCst), 3);
        assert_eq!(h.provider.models_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_rejects_mixed_lengths_before_probing() {
        let h = harness(FakeProvider::new());

        let data = message(&h.router, batch(&format!("{},sk-short", key('a')))).await;

        assert_eq!(data.flags, Some(FLAG_EPHEMERAL));
        assert!(data.content.unwrap().contains("exactly 51 characters"));
        assert_eq!(h.provider.completion_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_click_rechecks_only_available_keys() {
        let (a, b, c) = (key('a'), key('b'), key('c'));
        let h = harness(
            FakeProvider::new()
                .with(&a, KeyBehavior::Valid(vec!["gpt-4"]))
                .with(&b, KeyBehavior::NoQuota)
                .with(&c, KeyBehavior::Valid(vec!["gpt-4o-mini"])),
        );
        let report = message(&h.router, batch(&format!("{}\n{}\n{}", a, b, c))).await;

        let resp = response(h.router.route(click_on(report)).await);

        assert_eq!(resp.kind, RESPONSE_UPDATE_MESSAGE);
        assert_eq!(resp.data.unwrap().components, Some(vec![]));
        wait_for(|| !h.poster.sent().is_empty()).await;
        assert_eq!(h.provider.models_calls.load(Ordering::SeqCst), 2);
        let sent = h.poster.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "chan");
        let description = sent[0].1.embeds[0].description.clone().unwrap();
        assert_eq!(
            description.lines().collect::<Vec<_>>(),
            vec![format!("{} - GPT-4 :o: ", a), format!("{} - GPT-4 :x: ", c)]
        );
    }

    #[tokio::test]
    async fn test_click_clears_button_before_slow_recheck_finishes() {
        let a = key('a');
        let h = harness(
            FakeProvider::new()
                .with(&a, KeyBehavior::Valid(vec!["gpt-4"]))
                .with_delay(&a, 300),
        );
        let report = report_of(&[format!("{} - 🟢 ", a)], "1");

        let click = h.router.route(click_on(report));
        let reply = tokio::time::timeout(Duration::from_millis(100), click)
            .await
            .expect("click is acknowledged without waiting for the recheck");

        assert_eq!(response(reply), InteractionResponse::update(MessageData::clear_components()));
        assert!(h.poster.sent().is_empty());
        wait_for(|| h.poster.sent().len() == 1).await;
    }

    #[tokio::test]
    async fn test_click_all_unavailable_issues_no_probes() {
        let h = harness(FakeProvider::new());
        let lines = [
            format!("{} - 🔴 Invalid API Key", key('a')),
            format!("{} - 🔴 Exceeded quota", key('b')),
        ];

        let resp = response(h.router.route(click_on(report_of(&lines, "00"))).await);

        assert_eq!(resp, InteractionResponse::update(MessageData::clear_components()));
        assert_eq!(h.provider.models_calls.load(Ordering::SeqCst), 0);
        assert!(h.poster.sent().is_empty());
    }

    #[tokio::test]
    async fn test_click_without_report_still_clears_button() {
        let h = harness(FakeProvider::new());
        let resp = response(h.router.route(click_on(MessageData::default())).await);
        assert_eq!(resp, InteractionResponse::update(MessageData::clear_components()));
        assert_eq!(h.provider.models_calls.load(Ordering::SeqCst), 0);
    }
}
