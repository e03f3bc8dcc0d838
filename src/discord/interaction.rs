//! Inbound interaction payloads.
//!
//! Discord discriminates on an integer `type`, so the wire shape is read
//! loosely into [`RawInteraction`] and then narrowed into the closed
//! [`Interaction`] enum the router matches on.

use serde::Deserialize;
use serde_json::Value;

use super::response::Embed;
use crate::commands::{CommandName, ComponentId, OPTION_TYPE_BOOLEAN, OPTION_TYPE_STRING};

const INTERACTION_PING: u8 = 1;
const INTERACTION_APPLICATION_COMMAND: u8 = 2;
const INTERACTION_MESSAGE_COMPONENT: u8 = 3;

const COMMAND_TYPE_CHAT_INPUT: u8 = 1;
const COMPONENT_TYPE_BUTTON: u8 = 2;

// ── Wire Shape ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RawInteraction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub message: Option<HostMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct CommandData {
    name: String,
    #[serde(rename = "type", default = "default_command_type")]
    kind: u8,
    #[serde(default)]
    options: Vec<RawOption>,
}

fn default_command_type() -> u8 {
    COMMAND_TYPE_CHAT_INPUT
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ComponentData {
    custom_id: String,
    #[serde(default)]
    component_type: Option<u8>,
}

/// The message that hosted a clicked component, including its embeds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostMessage {
    pub id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl HostMessage {
    pub fn first_description(&self) -> Option<&str> {
        self.embeds.first()?.description.as_deref()
    }

    pub fn first_footer(&self) -> Option<&str> {
        Some(self.embeds.first()?.footer.as_ref()?.text.as_str())
    }
}

// ── Closed Model ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Handshake,
    Command(CommandInvocation),
    ComponentClick(ComponentClick),
    /// Anything else; answered with the "unknown" response.
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    pub command: CommandName,
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOption {
    String { name: String, value: String },
    Boolean { name: String, value: bool },
    Other { name: String },
}

impl CommandInvocation {
    pub fn first_string(&self) -> Option<&str> {
        self.options.iter().find_map(|o| match o {
            CommandOption::String { value, .. } => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn first_bool(&self) -> Option<bool> {
        self.options.iter().find_map(|o| match o {
            CommandOption::Boolean { value, .. } => Some(*value),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentClick {
    pub component: ComponentId,
    pub channel_id: String,
    pub message: HostMessage,
}

impl Interaction {
    /// Parse a verified request body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawInteraction = serde_json::from_slice(body)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_raw(raw: RawInteraction) -> Self {
        match raw.kind {
            INTERACTION_PING => Self::Handshake,
            INTERACTION_APPLICATION_COMMAND => Self::command(raw),
            INTERACTION_MESSAGE_COMPONENT => Self::component(raw),
            other => Self::Unrecognized(format!("interaction type {}", other)),
        }
    }

    fn command(raw: RawInteraction) -> Self {
        let data = match raw.data.map(serde_json::from_value::<CommandData>) {
            Some(Ok(d)) => d,
            _ => return Self::Unrecognized("command without data".into()),
        };
        if data.kind != COMMAND_TYPE_CHAT_INPUT {
            return Self::Unrecognized(format!("command type {}", data.kind));
        }
        let command = match CommandName::parse(&data.name) {
            Some(c) => c,
            None => return Self::Unrecognized(format!("command {}", data.name)),
        };

        let options = data
            .options
            .into_iter()
            .map(|o| match (o.kind, o.value) {
                (OPTION_TYPE_STRING, Some(Value::String(value))) => {
                    CommandOption::String { name: o.name, value }
                }
                (OPTION_TYPE_BOOLEAN, Some(Value::Bool(value))) => {
                    CommandOption::Boolean { name: o.name, value }
                }
                _ => CommandOption::Other { name: o.name },
            })
            .collect();

        Self::Command(CommandInvocation { command, options })
    }

    fn component(raw: RawInteraction) -> Self {
        let data = match raw.data.map(serde_json::from_value::<ComponentData>) {
            Some(Ok(d)) => d,
            _ => return Self::Unrecognized("component without data".into()),
        };
        if data.component_type.is_some_and(|t| t != COMPONENT_TYPE_BUTTON) {
            return Self::Unrecognized(format!("component type {:?}", data.component_type));
        }
        let component = match ComponentId::parse(&data.custom_id) {
            Some(c) => c,
            None => return Self::Unrecognized(format!("component {}", data.custom_id)),
        };
        let message = match raw.message {
            Some(m) => m,
            None => return Self::Unrecognized("component without message".into()),
        };
        let channel_id = raw
            .channel_id
            .or(raw.channel.map(|c| c.id))
            .or_else(|| message.channel_id.clone());
        match channel_id {
            Some(channel_id) => {
                Self::ComponentClick(ComponentClick { component, channel_id, message })
            }
            None => Self::Unrecognized("component without channel".into()),
        }
    }
}
