// Invite tracking - attribution of joins to invites, effective invite
// counts and rank rewards. Shares the moderation store and gateway ports.

pub mod invite_models;
pub mod invite_service;

pub use invite_models::*;
pub use invite_service::*;
