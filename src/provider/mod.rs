//! Provider seam — the two cheap calls a probe makes, and the closed
//! shape of what comes back from them.
//!
//! The prober never pokes at raw JSON. An adapter turns each HTTP
//! response into a [`ProviderReply`]: the success payload, a provider
//! error with its code narrowed to the handful the classifier cares
//! about, or an opaque fallback when the body is neither.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub mod openai;

// ── Error Shape ─────────────────────────────────────────────────────

/// `error.code` as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidApiKey,
    InsufficientQuota,
    Other(String),
    /// The error object carried no `code` (or a non-string one).
    Missing,
}

impl ErrorCode {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("invalid_api_key") => Self::InvalidApiKey,
            Some("insufficient_quota") => Self::InsufficientQuota,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Missing,
        }
    }
}

/// `error.type` as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    Other(String),
    Missing,
}

impl ErrorKind {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("invalid_request_error") => Self::InvalidRequest,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Missing,
        }
    }
}

/// `{ "error": { "code", "type", "message" } }`, every field optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub message: Option<String>,
}

impl ProviderError {
    fn from_value(error: &Value) -> Self {
        match error {
            Value::Object(_) => Self {
                code: ErrorCode::parse(error["code"].as_str()),
                kind: ErrorKind::parse(error["type"].as_str()),
                message: error["message"].as_str().map(str::to_string),
            },
            // Some proxies answer `{"error": "..."}`.
            Value::String(s) => Self {
                code: ErrorCode::Missing,
                kind: ErrorKind::Missing,
                message: Some(s.clone()),
            },
            _ => Self {
                code: ErrorCode::Missing,
                kind: ErrorKind::Missing,
                message: None,
            },
        }
    }

    /// The provider's message, or `fallback` when it sent none.
    pub fn message_or(&self, fallback: &str) -> String {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => fallback.to_string(),
        }
    }
}

// ── Replies ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody<T> {
    Success(T),
    Error(ProviderError),
    /// Neither the success payload nor an error object.
    Unrecognized,
}

/// One provider response: transport status plus the classified body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply<T> {
    pub status: u16,
    pub body: ReplyBody<T>,
}

impl<T> ProviderReply<T> {
    /// 429 is a rate-limit signal regardless of what the body says.
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn error(&self) -> Option<&ProviderError> {
        match &self.body {
            ReplyBody::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Body of a successful inference probe. Its content is never used.
pub type CompletionReply = ProviderReply<Value>;

/// Classify a raw response body.
///
/// An `error` member wins over the transport status; a success payload
/// is only accepted on a 2xx status.
pub fn parse_reply<T: DeserializeOwned>(status: u16, body: &str) -> ProviderReply<T> {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return ProviderReply { status, body: ReplyBody::Unrecognized },
    };

    if let Some(error) = parsed.get("error").filter(|e| !e.is_null()) {
        return ProviderReply {
            status,
            body: ReplyBody::Error(ProviderError::from_value(error)),
        };
    }

    if !(200..300).contains(&status) {
        return ProviderReply { status, body: ReplyBody::Unrecognized };
    }

    match serde_json::from_value::<T>(parsed) {
        Ok(payload) => ProviderReply { status, body: ReplyBody::Success(payload) },
        Err(_) => ProviderReply { status, body: ReplyBody::Unrecognized },
    }
}

// ── Models Listing ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub object: String,
}

impl ModelList {
    /// Ids of the entries that are actual models.
    pub fn model_ids(&self) -> Vec<String> {
        self.data
            .iter()
            .filter(|m| m.object.is_empty() || m.object == "model")
            .map(|m| m.id.clone())
            .collect()
    }

    /// Exact membership; `gpt-4o` does not count as `gpt-4`.
    pub fn contains_model(&self, model_id: &str) -> bool {
        self.data.iter().any(|m| m.id == model_id)
    }
}

/// Loose tier match used by the single check's indicator.
pub fn matches_tier(model_id: &str, tier_model: &str) -> bool {
    model_id.starts_with(tier_model)
}

// ── Adapter Trait ───────────────────────────────────────────────────

/// The request never produced a response (connect error, reset, timeout).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// The two probe calls against an inference provider.
///
/// The credential is passed through as a bearer token; adapters must
/// not store, log, or cache it.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Unique provider identifier (e.g. "openai").
    fn provider_id(&self) -> &str;

    /// Lightweight read of the models listing.
    async fn list_models(&self, key: &str) -> Result<ProviderReply<ModelList>, TransportError>;

    /// Deliberately incomplete inference request. Never billed; used
    /// only to surface the quota error the models listing hides.
    async fn probe_completion(&self, key: &str) -> Result<CompletionReply, TransportError>;
}
