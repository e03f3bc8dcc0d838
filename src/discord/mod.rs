//! Discord interactions: the inbound payload, the outbound response,
//! and the REST calls made outside the interaction response.

pub mod interaction;
pub mod response;
pub mod rest;

pub use interaction::{CommandInvocation, CommandOption, ComponentClick, HostMessage, Interaction};
pub use response::{ActionRow, Embed, EmbedField, EmbedFooter, InteractionResponse, MessageData};
