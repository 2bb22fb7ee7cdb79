// Serenity-backed implementation of the core gateway port. Each method is a
// single REST call; all sequencing and precondition logic stays in core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

use crate::core::moderation::{GatewayError, ModGateway};

pub struct SerenityModGateway {
    http: Arc<serenity::Http>,
}

impl SerenityModGateway {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    fn api_err(e: serenity::Error) -> GatewayError {
        GatewayError::Api(e.to_string())
    }

    fn is_not_found(e: &serenity::Error) -> bool {
        matches!(
            e,
            serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(resp))
                if resp.status_code == serenity::StatusCode::NOT_FOUND
        )
    }
}

#[async_trait]
impl ModGateway for SerenityModGateway {
    async fn timeout(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let ts = serenity::Timestamp::from_unix_timestamp(until.timestamp())
            .map_err(|e| GatewayError::Api(e.to_string()))?;
        serenity::GuildId::new(guild_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new()
                    .disable_communication_until_datetime(ts)
                    .audit_log_reason(reason),
            )
            .await
            .map_err(Self::api_err)?;
        Ok(())
    }

    async fn clear_timeout(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new().enable_communication(),
            )
            .await
            .map_err(Self::api_err)?;
        Ok(())
    }

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .kick_with_reason(&self.http, serenity::UserId::new(user_id), reason)
            .await
            .map_err(Self::api_err)
    }

    async fn ban(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .ban_with_reason(
                &self.http,
                serenity::UserId::new(user_id),
                delete_message_days,
                reason,
            )
            .await
            .map_err(Self::api_err)
    }

    async fn unban(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .unban(&self.http, serenity::UserId::new(user_id))
            .await
            .map_err(Self::api_err)
    }

    async fn set_voice_mute(
        &self,
        guild_id: u64,
        user_id: u64,
        muted: bool,
    ) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new().mute(muted),
            )
            .await
            .map_err(Self::api_err)?;
        Ok(())
    }

    async fn set_voice_deaf(
        &self,
        guild_id: u64,
        user_id: u64,
        deafened: bool,
    ) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new().deafen(deafened),
            )
            .await
            .map_err(Self::api_err)?;
        Ok(())
    }

    async fn disconnect(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new().disconnect_member(),
            )
            .await
            .map_err(Self::api_err)?;
        Ok(())
    }

    async fn move_member(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
    ) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new().voice_channel(serenity::ChannelId::new(channel_id)),
            )
            .await
            .map_err(Self::api_err)?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<(), GatewayError> {
        serenity::ChannelId::new(channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message_id))
            .await
            .map_err(Self::api_err)
    }

    async fn bulk_delete(
        &self,
        channel_id: u64,
        message_ids: &[u64],
    ) -> Result<(), GatewayError> {
        let ids: Vec<serenity::MessageId> = message_ids
            .iter()
            .map(|id| serenity::MessageId::new(*id))
            .collect();
        serenity::ChannelId::new(channel_id)
            .delete_messages(&self.http, ids)
            .await
            .map_err(Self::api_err)
    }

    async fn member_role_ids(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<Vec<u64>>, GatewayError> {
        match self
            .http
            .get_member(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
            )
            .await
        {
            Ok(member) => Ok(Some(member.roles.iter().map(|r| r.get()).collect())),
            Err(e) if Self::is_not_found(&e) => Ok(None),
            Err(e) => Err(Self::api_err(e)),
        }
    }

    async fn add_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.http
            .add_member_role(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some("Invite rank reward"),
            )
            .await
            .map_err(Self::api_err)
    }

    async fn remove_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.http
            .remove_member_role(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some("Invite rank reward"),
            )
            .await
            .map_err(Self::api_err)
    }
}
