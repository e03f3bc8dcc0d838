use serde::{Deserialize, Serialize};

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_UPDATE_MESSAGE: u8 = 7;

/// Message flag: only the invoking user sees it.
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const BUTTON_STYLE_SECONDARY: u8 = 2;

pub const COLOR_RED: u32 = 0xff0000;
pub const COLOR_GREEN: u32 = 0x00ff00;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self { kind: RESPONSE_PONG, data: None }
    }

    pub fn message(data: MessageData) -> Self {
        Self { kind: RESPONSE_CHANNEL_MESSAGE, data: Some(data) }
    }

    /// Edit the message that hosted the clicked component.
    pub fn update(data: MessageData) -> Self {
        Self { kind: RESPONSE_UPDATE_MESSAGE, data: Some(data) }
    }
}

/// Message body, used both in interaction responses and in
/// `POST /channels/{id}/messages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    /// `Some(vec![])` clears the message's components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ActionRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
}

impl MessageData {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Default::default() }
    }

    pub fn embed(embed: Embed) -> Self {
        Self { embeds: vec![embed], ..Default::default() }
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.flags = if ephemeral { Some(FLAG_EPHEMERAL) } else { Some(0) };
        self
    }

    pub fn clear_components() -> Self {
        Self { components: Some(Vec::new()), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    pub fn colored(color: u32, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            color: Some(color),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn single_button(label: impl Into<String>, custom_id: &str) -> Self {
        Self {
            kind: COMPONENT_ACTION_ROW,
            components: vec![Button {
                kind: COMPONENT_BUTTON,
                label: label.into(),
                custom_id: custom_id.to_string(),
                style: BUTTON_STYLE_SECONDARY,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub label: String,
    pub custom_id: String,
    pub style: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageReference {
    pub message_id: String,
    pub fail_if_not_exists: bool,
}
