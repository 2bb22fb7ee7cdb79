// Storage and gateway ports - the two seams the core services depend on.
// Infra provides the persistence impls, the discord layer the gateway impl,
// and tests provide in-memory/recording fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::moderation_models::{
    AutomodConfig, GuildSettings, MemberRecord, ModLogEntry,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("discord api error: {0}")]
    Api(String),
}

/// Persistence contract for moderation state.
///
/// Reads of missing records return defaults rather than errors; a member or
/// guild that was never moderated simply has the default state.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Fetch the record for a member, defaulting if absent.
    async fn member_record(&self, guild_id: u64, member_id: u64)
        -> Result<MemberRecord, StoreError>;

    async fn save_member_record(&self, record: &MemberRecord) -> Result<(), StoreError>;

    /// Fetch a guild's automod configuration, defaulting if absent.
    async fn automod_config(&self, guild_id: u64) -> Result<AutomodConfig, StoreError>;

    async fn save_automod_config(
        &self,
        guild_id: u64,
        config: &AutomodConfig,
    ) -> Result<(), StoreError>;

    /// Fetch a guild's general settings, defaulting if absent.
    async fn guild_settings(&self, guild_id: u64) -> Result<GuildSettings, StoreError>;

    async fn save_guild_settings(
        &self,
        guild_id: u64,
        settings: &GuildSettings,
    ) -> Result<(), StoreError>;

    /// Append one entry to the immutable audit log.
    async fn append_mod_log(&self, entry: &ModLogEntry) -> Result<(), StoreError>;

    /// Most recent audit entries for a target, newest first.
    async fn mod_logs(
        &self,
        guild_id: u64,
        target_id: u64,
        limit: u32,
    ) -> Result<Vec<ModLogEntry>, StoreError>;
}

/// The Discord REST effects the action engine can invoke. Every method is a
/// single remote call; sequencing and precondition checks live in core.
#[async_trait]
pub trait ModGateway: Send + Sync {
    async fn timeout(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), GatewayError>;

    async fn clear_timeout(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError>;

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError>;

    async fn ban(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), GatewayError>;

    async fn unban(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError>;

    async fn set_voice_mute(
        &self,
        guild_id: u64,
        user_id: u64,
        muted: bool,
    ) -> Result<(), GatewayError>;

    async fn set_voice_deaf(
        &self,
        guild_id: u64,
        user_id: u64,
        deafened: bool,
    ) -> Result<(), GatewayError>;

    async fn disconnect(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError>;

    async fn move_member(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
    ) -> Result<(), GatewayError>;

    async fn delete_message(&self, channel_id: u64, message_id: u64)
        -> Result<(), GatewayError>;

    async fn bulk_delete(
        &self,
        channel_id: u64,
        message_ids: &[u64],
    ) -> Result<(), GatewayError>;

    /// Role ids currently held by a member, `None` if they left the guild.
    async fn member_role_ids(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<Vec<u64>>, GatewayError>;

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64)
        -> Result<(), GatewayError>;

    async fn remove_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError>;
}
