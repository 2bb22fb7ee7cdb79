// Invite-tracking domain models.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Pseudo-inviter id recorded when a join is attributed to the guild's
/// vanity URL. Reserved; never a real member id.
pub const VANITY_INVITER: u64 = 0;

/// One invite as observed from the gateway, cached per guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteEntry {
    pub code: String,
    pub uses: u32,
    /// 0 means unlimited.
    pub max_uses: u32,
    pub inviter_id: u64,
    /// Set when the invite disappeared from the guild; deleted invites stay
    /// cached so a final use can still be attributed.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A successful join attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub inviter_id: u64,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("discord api error: {0}")]
    Gateway(String),
}
