// Invite attribution engine.
//
// The service keeps a per-guild cache of invite snapshots. Attribution works
// by diffing the snapshot taken at join time against the previous one: the
// invite whose use count went up is the one the joiner used. Invites that
// vanished between snapshots (deleted, or consumed at max uses) are covered
// by a fallback over the stale entries.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use crate::core::moderation::{InviteRank, MemberRecord, ModGateway, ModerationStore};

use super::invite_models::{Attribution, InviteEntry, InviteError, VANITY_INVITER};

/// Whether a reward pass follows an invite being gained or lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardMode {
    Added,
    Removed,
}

/// Role changes a reward pass decided on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardDelta {
    pub grant: Vec<u64>,
    pub revoke: Vec<u64>,
}

impl RewardDelta {
    pub fn is_empty(&self) -> bool {
        self.grant.is_empty() && self.revoke.is_empty()
    }
}

/// Pure rank-reward decision: which roles to grant or revoke given the
/// inviter's effective count and currently held roles.
///
/// On `Added` the member's roles converge on their qualification in both
/// directions; on `Removed` only disqualified roles are revoked, so a rank
/// is never granted by losing invites. Already-correct state produces an
/// empty delta.
pub fn reward_delta(
    effective: i64,
    ranks: &[InviteRank],
    held: &HashSet<u64>,
    mode: RewardMode,
) -> RewardDelta {
    let mut delta = RewardDelta::default();
    for rank in ranks {
        let qualifies = effective >= rank.invites;
        let holds = held.contains(&rank.role_id);
        match mode {
            RewardMode::Added => {
                if qualifies && !holds {
                    delta.grant.push(rank.role_id);
                } else if !qualifies && holds {
                    delta.revoke.push(rank.role_id);
                }
            }
            RewardMode::Removed => {
                if !qualifies && holds {
                    delta.revoke.push(rank.role_id);
                }
            }
        }
    }
    delta
}

pub struct InviteService<S: ModerationStore, G: ModGateway> {
    store: Arc<S>,
    gateway: Arc<G>,
    cache: DashMap<u64, HashMap<String, InviteEntry>>,
}

impl<S: ModerationStore, G: ModGateway> InviteService<S, G> {
    pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self {
        Self {
            store,
            gateway,
            cache: DashMap::new(),
        }
    }

    /// Replace a guild's cached snapshot wholesale (startup, guild join).
    pub fn set_snapshot(&self, guild_id: u64, invites: Vec<InviteEntry>) {
        self.cache.insert(
            guild_id,
            invites.into_iter().map(|i| (i.code.clone(), i)).collect(),
        );
    }

    /// A new invite was created; track it at its initial use count.
    pub fn handle_invite_create(&self, guild_id: u64, entry: InviteEntry) {
        if let Some(mut map) = self.cache.get_mut(&guild_id) {
            map.insert(entry.code.clone(), entry);
        }
    }

    /// An invite was deleted. The entry is kept with a deletion stamp so the
    /// join that consumed it can still be attributed.
    pub fn handle_invite_delete(
        &self,
        guild_id: u64,
        code: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        if let Some(mut map) = self.cache.get_mut(&guild_id) {
            if let Some(entry) = map.get_mut(code) {
                entry.deleted_at = Some(now);
            }
        }
    }

    /// Attribute a member join using the freshly fetched invite list.
    ///
    /// Returns the attribution when an invite could be matched. Bots and
    /// guilds without tracking (or without a prior snapshot) yield `None`.
    pub async fn track_join(
        &self,
        guild_id: u64,
        member_id: u64,
        is_bot: bool,
        current: Vec<InviteEntry>,
    ) -> Result<Option<Attribution>, InviteError> {
        if is_bot {
            return Ok(None);
        }
        let settings = self
            .store
            .guild_settings(guild_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        if !settings.invite_tracking {
            return Ok(None);
        }

        let new_map: HashMap<String, InviteEntry> = current
            .into_iter()
            .map(|i| (i.code.clone(), i))
            .collect();
        let old_map = match self.cache.insert(guild_id, new_map.clone()) {
            Some(old) => old,
            // First observation of this guild; nothing to diff against.
            None => return Ok(None),
        };

        let used = Self::find_used_invite(&old_map, &new_map);
        let Some(used) = used else {
            return Ok(None);
        };

        let mut joiner = self
            .store
            .member_record(guild_id, member_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        joiner.invites.inviter = Some(used.inviter_id);
        joiner.invites.code = Some(used.code.clone());
        self.store
            .save_member_record(&joiner)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;

        let mut inviter = self
            .store
            .member_record(guild_id, used.inviter_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        inviter.invites.tracked += 1;
        self.store
            .save_member_record(&inviter)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;

        self.apply_rewards(guild_id, used.inviter_id, RewardMode::Added)
            .await?;

        Ok(Some(Attribution {
            inviter_id: used.inviter_id,
            code: used.code,
        }))
    }

    /// Primary diff: an invite whose use count increased. Fallback: an
    /// invite that vanished from the fresh list one use short of its cap
    /// (single-use invites are consumed on join). Stale entries are visited
    /// most-recently-deleted first and the first qualifying one wins.
    fn find_used_invite(
        old_map: &HashMap<String, InviteEntry>,
        new_map: &HashMap<String, InviteEntry>,
    ) -> Option<Attribution> {
        for entry in new_map.values() {
            if entry.uses > 0 {
                let prior = old_map.get(&entry.code).map_or(0, |o| o.uses);
                if prior < entry.uses {
                    return Some(Attribution {
                        inviter_id: entry.inviter_id,
                        code: entry.code.clone(),
                    });
                }
            }
        }

        let mut stale: Vec<&InviteEntry> = old_map
            .values()
            .filter(|e| !new_map.contains_key(&e.code))
            .collect();
        stale.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        stale
            .into_iter()
            .find(|e| e.max_uses > 0 && e.uses == e.max_uses - 1)
            .map(|e| Attribution {
                inviter_id: e.inviter_id,
                code: e.code.clone(),
            })
    }

    /// Charge a leave back to whoever invited the departing member.
    pub async fn track_leave(
        &self,
        guild_id: u64,
        member_id: u64,
        is_bot: bool,
    ) -> Result<(), InviteError> {
        if is_bot {
            return Ok(());
        }
        let settings = self
            .store
            .guild_settings(guild_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        if !settings.invite_tracking {
            return Ok(());
        }

        let record = self
            .store
            .member_record(guild_id, member_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        let Some(inviter_id) = record.invites.inviter else {
            return Ok(());
        };

        let mut inviter = self
            .store
            .member_record(guild_id, inviter_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        inviter.invites.left += 1;
        self.store
            .save_member_record(&inviter)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;

        self.apply_rewards(guild_id, inviter_id, RewardMode::Removed)
            .await
    }

    /// Adjust manual invite credit and re-run rewards in the matching
    /// direction.
    pub async fn add_invites(
        &self,
        guild_id: u64,
        member_id: u64,
        amount: i64,
    ) -> Result<MemberRecord, InviteError> {
        let mut record = self
            .store
            .member_record(guild_id, member_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        if amount >= 0 {
            record.invites.added += amount as u32;
        } else {
            record.invites.fake += (-amount) as u32;
        }
        self.store
            .save_member_record(&record)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;

        let mode = if amount >= 0 {
            RewardMode::Added
        } else {
            RewardMode::Removed
        };
        self.apply_rewards(guild_id, member_id, mode).await?;
        Ok(record)
    }

    /// Converge the inviter's rank-reward roles on their effective count.
    /// Role failures are logged and skipped so one bad role never blocks
    /// the rest.
    async fn apply_rewards(
        &self,
        guild_id: u64,
        inviter_id: u64,
        mode: RewardMode,
    ) -> Result<(), InviteError> {
        if inviter_id == VANITY_INVITER {
            return Ok(());
        }
        let settings = self
            .store
            .guild_settings(guild_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        if settings.invite_ranks.is_empty() {
            return Ok(());
        }

        let held: HashSet<u64> = match self.gateway.member_role_ids(guild_id, inviter_id).await {
            Ok(Some(roles)) => roles.into_iter().collect(),
            // Inviter is no longer a member; nothing to converge.
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(guild_id, inviter_id, "failed to fetch inviter roles: {e}");
                return Ok(());
            }
        };

        let record = self
            .store
            .member_record(guild_id, inviter_id)
            .await
            .map_err(|e| InviteError::Storage(e.to_string()))?;
        let delta = reward_delta(
            record.invites.effective(),
            &settings.invite_ranks,
            &held,
            mode,
        );

        for role_id in delta.grant {
            if let Err(e) = self.gateway.add_role(guild_id, inviter_id, role_id).await {
                warn!(guild_id, inviter_id, role_id, "failed to grant rank role: {e}");
            }
        }
        for role_id in delta.revoke {
            if let Err(e) = self.gateway.remove_role(guild_id, inviter_id, role_id).await {
                warn!(guild_id, inviter_id, role_id, "failed to revoke rank role: {e}");
            }
        }
        Ok(())
    }
}
