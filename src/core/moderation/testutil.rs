// Shared test doubles for the core moderation services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;

use super::moderation_models::{
    AutomodConfig, GuildSettings, MemberRecord, ModLogEntry,
};
use super::ports::{GatewayError, ModGateway, ModerationStore, StoreError};

/// Dashmap-backed store used by the core service tests.
#[derive(Default)]
pub struct MemStore {
    pub members: DashMap<(u64, u64), MemberRecord>,
    pub configs: DashMap<u64, AutomodConfig>,
    pub settings: DashMap<u64, GuildSettings>,
    pub logs: Mutex<Vec<ModLogEntry>>,
    /// When set, every call fails with this message.
    pub fail_with: Option<String>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self) -> Result<(), StoreError> {
        match &self.fail_with {
            Some(msg) => Err(StoreError::Backend(msg.clone())),
            None => Ok(()),
        }
    }

    pub fn log_entries(&self) -> Vec<ModLogEntry> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModerationStore for MemStore {
    async fn member_record(
        &self,
        guild_id: u64,
        member_id: u64,
    ) -> Result<MemberRecord, StoreError> {
        self.check()?;
        Ok(self
            .members
            .get(&(guild_id, member_id))
            .map(|r| r.clone())
            .unwrap_or_else(|| MemberRecord::new(guild_id, member_id)))
    }

    async fn save_member_record(&self, record: &MemberRecord) -> Result<(), StoreError> {
        self.check()?;
        self.members
            .insert((record.guild_id, record.member_id), record.clone());
        Ok(())
    }

    async fn automod_config(&self, guild_id: u64) -> Result<AutomodConfig, StoreError> {
        self.check()?;
        Ok(self
            .configs
            .get(&guild_id)
            .map(|c| c.clone())
            .unwrap_or_default())
    }

    async fn save_automod_config(
        &self,
        guild_id: u64,
        config: &AutomodConfig,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.configs.insert(guild_id, config.clone());
        Ok(())
    }

    async fn guild_settings(&self, guild_id: u64) -> Result<GuildSettings, StoreError> {
        self.check()?;
        Ok(self
            .settings
            .get(&guild_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn save_guild_settings(
        &self,
        guild_id: u64,
        settings: &GuildSettings,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.settings.insert(guild_id, settings.clone());
        Ok(())
    }

    async fn append_mod_log(&self, entry: &ModLogEntry) -> Result<(), StoreError> {
        self.check()?;
        self.logs.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn mod_logs(
        &self,
        guild_id: u64,
        target_id: u64,
        limit: u32,
    ) -> Result<Vec<ModLogEntry>, StoreError> {
        self.check()?;
        let mut entries: Vec<ModLogEntry> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.guild_id == guild_id && e.target_id == target_id)
            .cloned()
            .collect();
        entries.reverse();
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

/// Every remote effect the gateway fake records, in invocation order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Timeout {
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
        reason: String,
    },
    ClearTimeout {
        guild_id: u64,
        user_id: u64,
    },
    Kick {
        guild_id: u64,
        user_id: u64,
        reason: String,
    },
    Ban {
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
        reason: String,
    },
    Unban {
        guild_id: u64,
        user_id: u64,
    },
    SetVoiceMute {
        guild_id: u64,
        user_id: u64,
        muted: bool,
    },
    SetVoiceDeaf {
        guild_id: u64,
        user_id: u64,
        deafened: bool,
    },
    Disconnect {
        guild_id: u64,
        user_id: u64,
    },
    MoveMember {
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
    },
    DeleteMessage {
        channel_id: u64,
        message_id: u64,
    },
    BulkDelete {
        channel_id: u64,
        message_ids: Vec<u64>,
    },
    AddRole {
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    },
    RemoveRole {
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    },
}

/// Gateway fake that records calls instead of hitting Discord.
#[derive(Default)]
pub struct RecordingGateway {
    pub calls: Mutex<Vec<GatewayCall>>,
    /// When set, every effect fails with this message.
    pub fail_with: Option<String>,
    /// Role sets returned by `member_role_ids`, keyed by (guild, user).
    pub roles: DashMap<(u64, u64), Option<Vec<u64>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        if let Some(msg) = &self.fail_with {
            return Err(GatewayError::Api(msg.clone()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModGateway for RecordingGateway {
    async fn timeout(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::Timeout {
            guild_id,
            user_id,
            until,
            reason: reason.to_string(),
        })
    }

    async fn clear_timeout(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        self.record(GatewayCall::ClearTimeout { guild_id, user_id })
    }

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::Kick {
            guild_id,
            user_id,
            reason: reason.to_string(),
        })
    }

    async fn ban(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::Ban {
            guild_id,
            user_id,
            delete_message_days,
            reason: reason.to_string(),
        })
    }

    async fn unban(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        self.record(GatewayCall::Unban { guild_id, user_id })
    }

    async fn set_voice_mute(
        &self,
        guild_id: u64,
        user_id: u64,
        muted: bool,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::SetVoiceMute {
            guild_id,
            user_id,
            muted,
        })
    }

    async fn set_voice_deaf(
        &self,
        guild_id: u64,
        user_id: u64,
        deafened: bool,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::SetVoiceDeaf {
            guild_id,
            user_id,
            deafened,
        })
    }

    async fn disconnect(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        self.record(GatewayCall::Disconnect { guild_id, user_id })
    }

    async fn move_member(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::MoveMember {
            guild_id,
            user_id,
            channel_id,
        })
    }

    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::DeleteMessage {
            channel_id,
            message_id,
        })
    }

    async fn bulk_delete(
        &self,
        channel_id: u64,
        message_ids: &[u64],
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::BulkDelete {
            channel_id,
            message_ids: message_ids.to_vec(),
        })
    }

    async fn member_role_ids(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<Vec<u64>>, GatewayError> {
        if let Some(msg) = &self.fail_with {
            return Err(GatewayError::Api(msg.clone()));
        }
        Ok(self
            .roles
            .get(&(guild_id, user_id))
            .map(|r| r.clone())
            .unwrap_or(Some(Vec::new())))
    }

    async fn add_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::AddRole {
            guild_id,
            user_id,
            role_id,
        })
    }

    async fn remove_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::RemoveRole {
            guild_id,
            user_id,
            role_id,
        })
    }
}
