//! Slash-command schema and the closed sets of command / button ids.
//!
//! The schema is what `keyprobe register` uploads to Discord. Its option
//! constraints are load-bearing: the batch decoder recovers credentials
//! by slicing exactly [`BATCH_KEY_LEN`] characters off each report line.

use serde::Serialize;

/// Length bounds Discord enforces on `/check key:`.
pub const CHECK_KEY_MIN_LEN: u32 = 40;
pub const CHECK_KEY_MAX_LEN: u32 = 60;

/// Exact credential length accepted by `/batchcheck`.
pub const BATCH_KEY_LEN: usize = 51;

/// Discord's ceiling for a string option.
const BATCH_INPUT_MAX_LEN: u32 = 6000;

// ── Closed Ids ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    Ping,
    Check,
    BatchCheck,
}

impl CommandName {
    /// Case-insensitive; `masscheck` is the old name of `batchcheck`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ping" => Some(Self::Ping),
            "check" => Some(Self::Check),
            "batchcheck" | "masscheck" => Some(Self::BatchCheck),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Check => "check",
            Self::BatchCheck => "batchcheck",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentId {
    TierCheck,
}

impl ComponentId {
    /// `gpt4` is the id carried by buttons on older reports.
    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            "tier-check" | "gpt4" => Some(Self::TierCheck),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TierCheck => "tier-check",
        }
    }
}

// ── Schema ──────────────────────────────────────────────────────────

pub const OPTION_TYPE_STRING: u8 = 3;
pub const OPTION_TYPE_BOOLEAN: u8 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionSpec {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

/// Every command the router understands.
pub fn definitions() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: CommandName::Ping.as_str(),
            description: "Respond with Pong",
            options: vec![],
        },
        CommandSpec {
            name: CommandName::Check.as_str(),
            description: "Check an OpenAI key",
            options: vec![
                OptionSpec {
                    kind: OPTION_TYPE_STRING,
                    name: "key",
                    description: "An OpenAI key",
                    required: Some(true),
                    min_length: Some(CHECK_KEY_MIN_LEN),
                    max_length: Some(CHECK_KEY_MAX_LEN),
                },
                OptionSpec {
                    kind: OPTION_TYPE_BOOLEAN,
                    name: "ephemeral",
                    description: "Only you can see the result",
                    required: None,
                    min_length: None,
                    max_length: None,
                },
            ],
        },
        CommandSpec {
            name: CommandName::BatchCheck.as_str(),
            description: "Check many OpenAI keys at once",
            options: vec![OptionSpec {
                kind: OPTION_TYPE_STRING,
                name: "keys",
                description: "Keys separated by commas or newlines",
                required: Some(true),
                min_length: Some(BATCH_KEY_LEN as u32),
                max_length: Some(BATCH_INPUT_MAX_LEN),
            }],
        },
    ]
}
