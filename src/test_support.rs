//! Scripted fakes for the provider and Discord seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::commands::BATCH_KEY_LEN;
use crate::discord::response::MessageData;
use crate::discord::rest::MessagePoster;
use crate::provider::{
    CompletionReply, ErrorCode, ErrorKind, ModelEntry, ModelList, ProviderApi, ProviderError,
    ProviderReply, ReplyBody, TransportError,
};

/// Poll `done` until it holds, for work that runs in the background.
pub async fn wait_for(done: impl Fn() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background work did not finish within 2s");
}

/// A batch-length credential made of one repeated character.
pub fn key(c: char) -> String {
    format!("sk-{}", c.to_string().repeat(BATCH_KEY_LEN - 3))
}

#[derive(Debug, Clone)]
pub enum KeyBehavior {
    /// Authenticates; lists these models; probe rejected as malformed.
    Valid(Vec<&'static str>),
    Invalid,
    NoQuota,
    /// Bare 429 on both endpoints.
    RateLimited,
    /// Connection never completes.
    Broken,
}

pub struct FakeProvider {
    behaviors: HashMap<String, KeyBehavior>,
    delays: HashMap<String, u64>,
    pub models_calls: AtomicUsize,
    pub completion_calls: AtomicUsize,
    /// Calls that got past their delay and produced a reply.
    pub finished_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            delays: HashMap::new(),
            models_calls: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
            finished_calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, key: &str, behavior: KeyBehavior) -> Self {
        self.behaviors.insert(key.to_string(), behavior);
        self
    }

    /// Delay this key's replies so it finishes after its siblings.
    pub fn with_delay(mut self, key: &str, millis: u64) -> Self {
        self.delays.insert(key.to_string(), millis);
        self
    }

    fn behavior(&self, key: &str) -> KeyBehavior {
        self.behaviors.get(key).cloned().unwrap_or(KeyBehavior::Invalid)
    }

    async fn pause(&self, key: &str) {
        if let Some(ms) = self.delays.get(key) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.finished_calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn error<T>(status: u16, code: ErrorCode, kind: ErrorKind, message: &str) -> ProviderReply<T> {
    ProviderReply {
        status,
        body: ReplyBody::Error(ProviderError { code, kind, message: Some(message.to_string()) }),
    }
}

fn bare_429<T>() -> ProviderReply<T> {
    ProviderReply { status: 429, body: ReplyBody::Unrecognized }
}

fn invalid_key<T>() -> ProviderReply<T> {
    error(401, ErrorCode::InvalidApiKey, ErrorKind::InvalidRequest, "Incorrect API key provided")
}

#[async_trait]
impl ProviderApi for FakeProvider {
    fn provider_id(&self) -> &str {
        "fake"
    }

    async fn list_models(&self, key: &str) -> Result<ProviderReply<ModelList>, TransportError> {
        self.models_calls.fetch_add(1, Ordering::SeqCst);
        self.pause(key).await;
        let listing = |ids: &[&str]| ProviderReply {
            status: 200,
            body: ReplyBody::Success(ModelList {
                data: ids
                    .iter()
                    .map(|id| ModelEntry { id: id.to_string(), object: "model".into() })
                    .collect(),
            }),
        };
        match self.behavior(key) {
            KeyBehavior::Valid(ids) => Ok(listing(&ids)),
            KeyBehavior::NoQuota => Ok(listing(&["gpt-3.5-turbo"])),
            KeyBehavior::Invalid => Ok(invalid_key()),
            KeyBehavior::RateLimited => Ok(bare_429()),
            KeyBehavior::Broken => Err(TransportError("connection reset".into())),
        }
    }

    async fn probe_completion(&self, key: &str) -> Result<CompletionReply, TransportError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.pause(key).await;
        match self.behavior(key) {
            KeyBehavior::Valid(_) => Ok(error(
                400,
                ErrorCode::Missing,
                ErrorKind::InvalidRequest,
                "'messages' is a required property",
            )),
            KeyBehavior::NoQuota => Ok(error(
                429,
                ErrorCode::InsufficientQuota,
                ErrorKind::Other("insufficient_quota".into()),
                "You exceeded your current quota",
            )),
            KeyBehavior::Invalid => Ok(invalid_key()),
            KeyBehavior::RateLimited => Ok(bare_429()),
            KeyBehavior::Broken => Err(TransportError("connection reset".into())),
        }
    }
}

/// Records every message instead of sending it.
pub struct FakePoster {
    pub sent: Mutex<Vec<(String, MessageData)>>,
    fail: bool,
}

impl FakePoster {
    pub fn new() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: false }
    }

    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: true }
    }

    pub fn sent(&self) -> Vec<(String, MessageData)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePoster for FakePoster {
    async fn create_message(&self, channel_id: &str, message: &MessageData) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((channel_id.to_string(), message.clone()));
        if self.fail {
            anyhow::bail!("Discord create message failed (500): {}", json!({"message": "boom"}));
        }
        Ok(())
    }
}
