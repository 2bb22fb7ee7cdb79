// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

pub mod gateway;

#[path = "moderation/automod_events.rs"]
pub mod automod_events;

#[path = "invites/invite_events.rs"]
pub mod invite_events;

// Re-export command types for convenience
pub use commands::moderation::{Data, Error};
