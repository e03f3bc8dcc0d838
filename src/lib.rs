//! KeyProbe: a Discord interactions bot that checks OpenAI API keys for
//! validity, remaining quota and premium-model access.

pub mod auth;
pub mod codec;
pub mod commands;
pub mod config;
pub mod discord;
pub mod error;
pub mod followup;
pub mod logger;
pub mod prober;
pub mod provider;
pub mod router;
pub mod server;

#[cfg(test)]
mod test_support;
