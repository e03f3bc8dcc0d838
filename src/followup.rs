//! Follow-up notifier — the tier re-check behind the report's button.
//!
//! Probes the models listing for each previously available key and posts
//! the outcome as a new message replying to the original report. The
//! click itself is acknowledged before any of this runs.

use std::sync::Arc;

use tracing::{error, info};

use crate::discord::response::{Embed, MessageData, MessageReference};
use crate::discord::rest::MessagePoster;
use crate::prober::{KeyProber, ProbeResult, ProbeStatus};

/// Where the follow-up goes: the report's channel, replying to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpTarget {
    pub channel_id: String,
    pub message_id: String,
}

pub struct FollowUpNotifier {
    prober: Arc<KeyProber>,
    poster: Arc<dyn MessagePoster>,
    tier_model: String,
    tier_label: String,
}

impl FollowUpNotifier {
    pub fn new(
        prober: Arc<KeyProber>,
        poster: Arc<dyn MessagePoster>,
        tier_model: &str,
        tier_label: &str,
    ) -> Self {
        Self {
            prober,
            poster,
            tier_model: tier_model.to_string(),
            tier_label: tier_label.to_string(),
        }
    }

    /// Run [`Self::recheck_tier`] in the background.
    pub fn spawn_recheck(self: &Arc<Self>, target: FollowUpTarget, credentials: Vec<String>) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            notifier.recheck_tier(&target, &credentials).await;
        });
    }

    /// Re-check tier access and post the result.
    ///
    /// Nothing is probed or posted for an empty set. A failed post is
    /// logged and swallowed; the caller clears the button either way.
    pub async fn recheck_tier(&self, target: &FollowUpTarget, credentials: &[String]) {
        if credentials.is_empty() {
            info!(message_id = %target.message_id, "No available keys to re-check");
            return;
        }

        let results = self.prober.probe_tier_batch(credentials, &self.tier_model).await;
        let with_tier = results.iter().filter(|r| r.model_tier == Some(true)).count();
        info!(
            keys = results.len(),
            with_tier,
            tier = %self.tier_model,
            "Tier re-check complete"
        );

        let message = render_followup(&results, &self.tier_label, &target.message_id);
        if let Err(e) = self.poster.create_message(&target.channel_id, &message).await {
            error!(channel_id = %target.channel_id, "Failed to post tier re-check: {:#}", e);
        }
    }
}

pub fn render_followup(results: &[ProbeResult], tier_label: &str, reply_to: &str) -> MessageData {
    let description = results
        .iter()
        .map(|r| {
            let mark = if r.model_tier == Some(true) { ":o:" } else { ":x:" };
            let reason = match &r.status {
                ProbeStatus::OtherError(message) => message.as_str(),
                _ => "",
            };
            format!("{} - {} {} {}", r.credential, tier_label, mark, reason)
        })
        .collect::<Vec<_>>()
        .join("\n");

    MessageData {
        embeds: vec![Embed { description: Some(description), ..Default::default() }],
        message_reference: Some(MessageReference {
            message_id: reply_to.to_string(),
            fail_if_not_exists: false,
        }),
        ..Default::default()
    }
}
