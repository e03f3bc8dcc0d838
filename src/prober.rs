//! Key prober — infers validity, quota and tier access for credentials
//! from cheap provider calls, and classifies each into a [`ProbeStatus`].
//!
//! Single check: models listing and inference probe run concurrently,
//! then [`classify_single`] applies the precedence
//! invalid key → other error → quota → 429 → valid.
//!
//! Batch check: only the inference probe, one per credential, all in
//! flight at once with no cap on fan-out. Results are placed by input
//! index, never by arrival order.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::provider::{
    CompletionReply, ErrorCode, ErrorKind, ModelList, ProviderApi, ProviderReply, ReplyBody,
    TransportError,
};

pub const TRANSPORT_FAILURE: &str = "transport failure";
pub const UNEXPECTED_RESPONSE: &str = "unexpected response";

// ── Status ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Valid,
    InvalidCredential,
    QuotaExceeded,
    RateLimited,
    OtherError(String),
}

impl ProbeStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::InvalidCredential => "invalid_credential",
            Self::QuotaExceeded => "quota_exceeded",
            Self::RateLimited => "rate_limited",
            Self::OtherError(_) => "other_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub credential: String,
    pub status: ProbeStatus,
    /// Models visible to the credential; only filled by a single check.
    pub models: Vec<String>,
    /// Premium-tier access; only filled by the follow-up tier probe.
    pub model_tier: Option<bool>,
}

impl ProbeResult {
    fn new(credential: &str, status: ProbeStatus) -> Self {
        Self {
            credential: credential.to_string(),
            status,
            models: Vec::new(),
            model_tier: None,
        }
    }

    pub fn has_tier(&self, tier_model: &str) -> bool {
        self.models
            .iter()
            .any(|m| crate::provider::matches_tier(m, tier_model))
    }
}

// ── Obfuscation ─────────────────────────────────────────────────────

/// Obfuscate a credential for logs: "sk-abc123def456" → "sk-a...f456"
pub fn obfuscate_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return format!("{}...", chars.iter().take(4).collect::<String>());
    }
    format!(
        "{}...{}",
        chars[..4].iter().collect::<String>(),
        chars[chars.len() - 4..].iter().collect::<String>()
    )
}

// ── Classification ──────────────────────────────────────────────────

/// Classify a single check from both probe replies.
///
/// Returns the status and, when valid, the model ids from the listing.
pub fn classify_single(
    models: Result<ProviderReply<ModelList>, TransportError>,
    completion: Result<CompletionReply, TransportError>,
) -> (ProbeStatus, Vec<String>) {
    let models = match models {
        Ok(reply) => reply,
        Err(_) => return (ProbeStatus::OtherError(TRANSPORT_FAILURE.into()), Vec::new()),
    };

    if let Some(err) = models.error() {
        if err.code == ErrorCode::InvalidApiKey {
            return (ProbeStatus::InvalidCredential, Vec::new());
        }
        return (
            ProbeStatus::OtherError(err.message_or(UNEXPECTED_RESPONSE)),
            Vec::new(),
        );
    }

    let completion = match completion {
        Ok(reply) => reply,
        Err(_) => return (ProbeStatus::OtherError(TRANSPORT_FAILURE.into()), Vec::new()),
    };
    if completion
        .error()
        .is_some_and(|e| e.code == ErrorCode::InsufficientQuota)
    {
        return (ProbeStatus::QuotaExceeded, Vec::new());
    }

    if models.is_rate_limited() {
        return (ProbeStatus::RateLimited, Vec::new());
    }

    match models.body {
        ReplyBody::Success(list) => (ProbeStatus::Valid, list.model_ids()),
        ReplyBody::Error(_) | ReplyBody::Unrecognized => (
            ProbeStatus::OtherError(UNEXPECTED_RESPONSE.into()),
            Vec::new(),
        ),
    }
}

/// Classify a batch entry from its inference probe alone.
///
/// `invalid_request_error` means the key authenticated and only the
/// deliberately incomplete payload was rejected, so it counts as valid.
pub fn classify_batch(completion: Result<CompletionReply, TransportError>) -> ProbeStatus {
    let reply = match completion {
        Ok(reply) => reply,
        Err(_) => return ProbeStatus::OtherError(TRANSPORT_FAILURE.into()),
    };

    match reply.error().map(|e| &e.code) {
        Some(ErrorCode::InvalidApiKey) => return ProbeStatus::InvalidCredential,
        Some(ErrorCode::InsufficientQuota) => return ProbeStatus::QuotaExceeded,
        _ => {}
    }

    if reply.is_rate_limited() {
        return ProbeStatus::RateLimited;
    }

    match &reply.body {
        ReplyBody::Success(_) => ProbeStatus::Valid,
        ReplyBody::Error(e) if e.kind == ErrorKind::InvalidRequest => ProbeStatus::Valid,
        ReplyBody::Error(e) => ProbeStatus::OtherError(e.message_or(UNEXPECTED_RESPONSE)),
        ReplyBody::Unrecognized => ProbeStatus::OtherError(UNEXPECTED_RESPONSE.into()),
    }
}

/// Classify a follow-up tier probe from the models listing.
///
/// Tier access means the listing holds `tier_model` itself. Any error is
/// surfaced verbatim; tier access is then `false`.
pub fn classify_tier(
    models: Result<ProviderReply<ModelList>, TransportError>,
    tier_model: &str,
) -> (ProbeStatus, bool) {
    match models {
        Err(_) => (ProbeStatus::OtherError(TRANSPORT_FAILURE.into()), false),
        Ok(reply) => match reply.body {
            ReplyBody::Success(list) => (ProbeStatus::Valid, list.contains_model(tier_model)),
            ReplyBody::Error(e) => {
                (ProbeStatus::OtherError(e.message_or(UNEXPECTED_RESPONSE)), false)
            }
            ReplyBody::Unrecognized => (ProbeStatus::OtherError(UNEXPECTED_RESPONSE.into()), false),
        },
    }
}

// ── Prober ──────────────────────────────────────────────────────────

pub struct KeyProber {
    provider: Arc<dyn ProviderApi>,
}

impl KeyProber {
    pub fn new(provider: Arc<dyn ProviderApi>) -> Self {
        Self { provider }
    }

    /// Full single-key check: both calls concurrently, then classify.
    pub async fn probe(&self, credential: &str) -> ProbeResult {
        let (models, completion) = tokio::join!(
            self.provider.list_models(credential),
            self.provider.probe_completion(credential),
        );
        let (status, models) = classify_single(models, completion);
        debug!(
            key = %obfuscate_key(credential),
            provider = self.provider.provider_id(),
            status = status.label(),
            models = models.len(),
            "Single probe classified"
        );
        ProbeResult {
            models,
            ..ProbeResult::new(credential, status)
        }
    }

    /// Inference probe for every credential at once.
    ///
    /// `result[i]` always belongs to `credentials[i]`; one failing probe
    /// never affects its siblings. Dropping the returned future aborts
    /// every probe still in flight.
    pub async fn probe_batch(&self, credentials: &[String]) -> Vec<ProbeResult> {
        let mut set = JoinSet::new();
        for (index, credential) in credentials.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let credential = credential.clone();
            set.spawn(async move {
                let status = classify_batch(provider.probe_completion(&credential).await);
                (index, ProbeResult::new(&credential, status))
            });
        }

        collect_in_order(set, credentials, |credential| {
            ProbeResult::new(credential, ProbeStatus::OtherError(TRANSPORT_FAILURE.into()))
        })
        .await
    }

    /// Models-listing probe per credential, answering tier access.
    pub async fn probe_tier_batch(
        &self,
        credentials: &[String],
        tier_model: &str,
    ) -> Vec<ProbeResult> {
        let mut set = JoinSet::new();
        for (index, credential) in credentials.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let credential = credential.clone();
            let tier_model = tier_model.to_string();
            set.spawn(async move {
                let models = provider.list_models(&credential).await;
                let (status, tier) = classify_tier(models, &tier_model);
                let result = ProbeResult {
                    model_tier: Some(tier),
                    ..ProbeResult::new(&credential, status)
                };
                (index, result)
            });
        }

        collect_in_order(set, credentials, |credential| ProbeResult {
            model_tier: Some(false),
            ..ProbeResult::new(credential, ProbeStatus::OtherError(TRANSPORT_FAILURE.into()))
        })
        .await
    }
}

/// Drain a fan-out into input order. A task that panicked leaves its
/// slot to `fallback`.
async fn collect_in_order(
    mut set: JoinSet<(usize, ProbeResult)>,
    credentials: &[String],
    fallback: impl Fn(&str) -> ProbeResult,
) -> Vec<ProbeResult> {
    let mut slots: Vec<Option<ProbeResult>> = vec![None; credentials.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warn!("Probe task failed: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(credentials)
        .map(|(slot, credential)| slot.unwrap_or_else(|| fallback(credential)))
        .collect()
}
