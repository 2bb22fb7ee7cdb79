// Core moderation module - automod rule evaluation, the punitive action
// state machine and the permission hierarchy that gates it.
// NO Discord dependencies here - the discord layer adapts gateway events
// into the plain types these services consume.

pub mod action_service;
pub mod antispam_cache;
pub mod automod_service;
pub mod hierarchy;
pub mod moderation_models;
pub mod patterns;
pub mod ports;

#[cfg(test)]
pub mod testutil;

pub use action_service::*;
pub use antispam_cache::*;
pub use automod_service::*;
pub use hierarchy::*;
pub use moderation_models::*;
pub use ports::*;
