// Punitive action engine. Every moderator-facing action flows through here:
// hierarchy guard, precondition checks, the gateway effect, then the audit
// log append. The discord layer only translates; the sequencing lives here.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, warn};

use super::hierarchy::can_act_on;
use super::moderation_models::{
    ActionContext, ActionError, EscalationAction, ModLogEntry, ModLogKind, PurgeFilter,
    PurgeRequest, WarnOutcome,
};
use super::patterns::contains_link;
use super::ports::{ModGateway, ModerationStore};

/// Escalation timeouts last this long.
pub const DEFAULT_TIMEOUT_HOURS: i64 = 24;

/// A softban deletes this many days of the target's messages.
pub const SOFTBAN_DELETE_DAYS: u8 = 7;

/// Upper bound on a single purge invocation.
pub const MAX_PURGE_AMOUNT: usize = 500;

/// Bulk deletion only reaches back this far.
pub const PURGE_WINDOW_DAYS: i64 = 14;

pub struct ActionService<S: ModerationStore, G: ModGateway> {
    store: Arc<S>,
    gateway: Arc<G>,
}

impl<S: ModerationStore, G: ModGateway> ActionService<S, G> {
    pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self {
        Self { store, gateway }
    }

    // ========================================================================
    // GUARDS AND SHARED PLUMBING
    // ========================================================================

    /// Issuer must outrank the target, and so must the bot.
    fn guard_hierarchy(&self, cx: &ActionContext) -> Result<(), ActionError> {
        if !can_act_on(cx.owner_id, &cx.issuer, &cx.target.rank) {
            return Err(ActionError::MemberPerm);
        }
        if !can_act_on(cx.owner_id, &cx.bot, &cx.target.rank) {
            return Err(ActionError::BotPerm);
        }
        Ok(())
    }

    async fn log(
        &self,
        cx: &ActionContext,
        kind: ModLogKind,
        reason: &str,
    ) -> Result<(), ActionError> {
        let entry = ModLogEntry {
            guild_id: cx.guild_id,
            target_id: cx.target.rank.member_id,
            issuer_id: cx.issuer.member_id,
            issuer_tag: cx.issuer_tag.clone(),
            reason: reason.to_string(),
            kind,
            at: Utc::now(),
            channel_id: None,
            deleted_count: None,
        };
        self.store
            .append_mod_log(&entry)
            .await
            .map_err(|e| ActionError::Storage(e.to_string()))
    }

    fn gateway_err(e: super::ports::GatewayError) -> ActionError {
        error!("gateway call failed: {e}");
        ActionError::Gateway(e.to_string())
    }

    // ========================================================================
    // TIMEOUTS
    // ========================================================================

    pub async fn timeout(
        &self,
        cx: &ActionContext,
        until: chrono::DateTime<Utc>,
        reason: &str,
    ) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        if matches!(cx.target.timeout_until, Some(t) if t > Utc::now()) {
            return Err(ActionError::AlreadyTimeout);
        }
        self.gateway
            .timeout(cx.guild_id, cx.target.rank.member_id, until, reason)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Timeout, reason).await
    }

    pub async fn untimeout(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        if !matches!(cx.target.timeout_until, Some(t) if t > Utc::now()) {
            return Err(ActionError::NoTimeout);
        }
        self.gateway
            .clear_timeout(cx.guild_id, cx.target.rank.member_id)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Untimeout, reason).await
    }

    // ========================================================================
    // REMOVALS
    // ========================================================================

    pub async fn kick(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        self.gateway
            .kick(cx.guild_id, cx.target.rank.member_id, reason)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Kick, reason).await
    }

    /// Ban-then-unban, wiping the target's last week of messages while
    /// letting them rejoin. Logged as a single SOFTBAN.
    pub async fn softban(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        self.gateway
            .ban(
                cx.guild_id,
                cx.target.rank.member_id,
                SOFTBAN_DELETE_DAYS,
                reason,
            )
            .await
            .map_err(Self::gateway_err)?;
        self.gateway
            .unban(cx.guild_id, cx.target.rank.member_id)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Softban, reason).await
    }

    pub async fn ban(
        &self,
        cx: &ActionContext,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        self.gateway
            .ban(
                cx.guild_id,
                cx.target.rank.member_id,
                delete_message_days,
                reason,
            )
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Ban, reason).await
    }

    /// Unban skips the hierarchy guard: the target is not a member, so there
    /// is no rank to compare.
    pub async fn unban(
        &self,
        cx: &ActionContext,
        reason: &str,
    ) -> Result<(), ActionError> {
        self.gateway
            .unban(cx.guild_id, cx.target.rank.member_id)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Unban, reason).await
    }

    // ========================================================================
    // VOICE
    // ========================================================================

    pub async fn voice_mute(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        let voice = cx.target.voice.as_ref().ok_or(ActionError::NoVoice)?;
        if voice.muted {
            return Err(ActionError::AlreadyMuted);
        }
        self.gateway
            .set_voice_mute(cx.guild_id, cx.target.rank.member_id, true)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::VMute, reason).await
    }

    pub async fn voice_unmute(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        let voice = cx.target.voice.as_ref().ok_or(ActionError::NoVoice)?;
        if !voice.muted {
            return Err(ActionError::NotMuted);
        }
        self.gateway
            .set_voice_mute(cx.guild_id, cx.target.rank.member_id, false)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::VUnmute, reason).await
    }

    pub async fn deafen(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        let voice = cx.target.voice.as_ref().ok_or(ActionError::NoVoice)?;
        if voice.deafened {
            return Err(ActionError::AlreadyDeafened);
        }
        self.gateway
            .set_voice_deaf(cx.guild_id, cx.target.rank.member_id, true)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Deafen, reason).await
    }

    pub async fn undeafen(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        let voice = cx.target.voice.as_ref().ok_or(ActionError::NoVoice)?;
        if !voice.deafened {
            return Err(ActionError::NotDeafened);
        }
        self.gateway
            .set_voice_deaf(cx.guild_id, cx.target.rank.member_id, false)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Undeafen, reason).await
    }

    pub async fn disconnect(&self, cx: &ActionContext, reason: &str) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        if cx.target.voice.is_none() {
            return Err(ActionError::NoVoice);
        }
        self.gateway
            .disconnect(cx.guild_id, cx.target.rank.member_id)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Disconnect, reason).await
    }

    /// `target_can_connect` is resolved by the caller against the destination
    /// channel's permission overwrites.
    pub async fn move_member(
        &self,
        cx: &ActionContext,
        dest_channel_id: u64,
        target_can_connect: bool,
        reason: &str,
    ) -> Result<(), ActionError> {
        self.guard_hierarchy(cx)?;
        let voice = cx.target.voice.as_ref().ok_or(ActionError::NoVoice)?;
        if voice.channel_id == dest_channel_id {
            return Err(ActionError::AlreadyInChannel);
        }
        if !target_can_connect {
            return Err(ActionError::TargetPerm);
        }
        self.gateway
            .move_member(cx.guild_id, cx.target.rank.member_id, dest_channel_id)
            .await
            .map_err(Self::gateway_err)?;
        self.log(cx, ModLogKind::Move, reason).await
    }

    // ========================================================================
    // WARNINGS
    // ========================================================================

    /// Record a warning. Hitting the guild's warning ceiling fires the
    /// configured escalation on the bot's own authority and resets the
    /// counter; an escalation failure is logged but never fails the warn.
    pub async fn warn(&self, cx: &ActionContext, reason: &str) -> Result<WarnOutcome, ActionError> {
        self.guard_hierarchy(cx)?;
        self.log(cx, ModLogKind::Warn, reason).await?;

        let mut record = self
            .store
            .member_record(cx.guild_id, cx.target.rank.member_id)
            .await
            .map_err(|e| ActionError::Storage(e.to_string()))?;
        record.warnings += 1;
        let warnings = record.warnings;

        let settings = self
            .store
            .guild_settings(cx.guild_id)
            .await
            .map_err(|e| ActionError::Storage(e.to_string()))?;

        let mut escalated = None;
        if settings.max_warn_limit > 0 && warnings >= settings.max_warn_limit {
            let action = settings.max_warn_action;
            match self
                .apply_escalation(&cx.with_bot_issuer(), action, "Max warnings reached")
                .await
            {
                Ok(()) => escalated = Some(action),
                Err(e) => warn!(
                    guild_id = cx.guild_id,
                    target_id = cx.target.rank.member_id,
                    "warning-ceiling escalation failed: {e}"
                ),
            }
            record.warnings = 0;
        }

        self.store
            .save_member_record(&record)
            .await
            .map_err(|e| ActionError::Storage(e.to_string()))?;

        Ok(WarnOutcome {
            warnings,
            escalated,
        })
    }

    /// Run one escalation action. The set excludes WARN by construction, so
    /// this can never re-enter the warning path.
    pub async fn apply_escalation(
        &self,
        cx: &ActionContext,
        action: EscalationAction,
        reason: &str,
    ) -> Result<(), ActionError> {
        match action {
            EscalationAction::Timeout => {
                let until = Utc::now() + Duration::hours(DEFAULT_TIMEOUT_HOURS);
                self.timeout(cx, until, reason).await
            }
            EscalationAction::Kick => self.kick(cx, reason).await,
            EscalationAction::Softban => self.softban(cx, reason).await,
            EscalationAction::Ban => self.ban(cx, 0, reason).await,
        }
    }

    // ========================================================================
    // PURGE
    // ========================================================================

    /// Bulk-delete messages matching the filter from an already-fetched
    /// window. Returns the number deleted.
    pub async fn purge(&self, req: &PurgeRequest) -> Result<u64, ActionError> {
        if !req.issuer_can_manage {
            return Err(ActionError::MemberPerm);
        }
        if !req.bot_can_manage {
            return Err(ActionError::BotPerm);
        }
        if req.amount == 0 || req.amount > MAX_PURGE_AMOUNT {
            return Err(ActionError::InvalidAmount);
        }

        let horizon = req.now - Duration::days(PURGE_WINDOW_DAYS);
        let matching: Vec<u64> = req
            .messages
            .iter()
            .filter(|m| m.deletable && m.created_at >= horizon && Self::matches(&req.filter, m))
            .take(req.amount)
            .map(|m| m.id)
            .collect();

        if matching.is_empty() {
            return Err(ActionError::NoMessages);
        }

        // Bulk deletion needs at least two messages; a single one that is the
        // issuer's own gets deleted directly but is not worth an audit entry.
        if matching.len() == 1 {
            let only = req
                .messages
                .iter()
                .find(|m| m.id == matching[0])
                .ok_or(ActionError::NoMessages)?;
            if only.author_id == req.issuer_id {
                self.gateway
                    .delete_message(req.channel_id, only.id)
                    .await
                    .map_err(Self::gateway_err)?;
                return Err(ActionError::NoMessages);
            }
        }

        self.gateway
            .bulk_delete(req.channel_id, &matching)
            .await
            .map_err(Self::gateway_err)?;

        let deleted = matching.len() as u64;
        let entry = ModLogEntry {
            guild_id: req.guild_id,
            target_id: req.issuer_id,
            issuer_id: req.issuer_id,
            issuer_tag: req.issuer_tag.clone(),
            reason: format!("Message purge ({})", req.filter),
            kind: ModLogKind::Purge,
            at: req.now,
            channel_id: Some(req.channel_id),
            deleted_count: Some(deleted),
        };
        self.store
            .append_mod_log(&entry)
            .await
            .map_err(|e| ActionError::Storage(e.to_string()))?;

        Ok(deleted)
    }

    fn matches(filter: &PurgeFilter, m: &super::moderation_models::MessageSnapshot) -> bool {
        match filter {
            PurgeFilter::All => true,
            PurgeFilter::Bot => m.author_is_bot,
            PurgeFilter::Link => contains_link(&m.content),
            PurgeFilter::Token(token) => {
                m.content.to_lowercase().contains(&token.to_lowercase())
            }
            PurgeFilter::Attachment => m.has_attachment,
            PurgeFilter::User(user_id) => m.author_id == *user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::moderation_models::{
        GuildSettings, MemberRank, MessageSnapshot, TargetState, VoiceInfo,
    };
    use super::super::testutil::{GatewayCall, MemStore, RecordingGateway};
    use super::*;

    fn cx() -> ActionContext {
        ActionContext {
            guild_id: 10,
            owner_id: 1,
            issuer: MemberRank {
                member_id: 2,
                top_role_position: 50,
            },
            issuer_tag: "mod#0001".into(),
            bot: MemberRank {
                member_id: 99,
                top_role_position: 90,
            },
            target: TargetState::member(MemberRank {
                member_id: 3,
                top_role_position: 5,
            }),
        }
    }

    fn service() -> (
        Arc<MemStore>,
        Arc<RecordingGateway>,
        ActionService<MemStore, RecordingGateway>,
    ) {
        let store = Arc::new(MemStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = ActionService::new(Arc::clone(&store), Arc::clone(&gateway));
        (store, gateway, service)
    }

    #[tokio::test]
    async fn kick_logs_after_effect() {
        let (store, gateway, service) = service();
        service.kick(&cx(), "being rude").await.unwrap();

        assert!(matches!(
            gateway.calls()[0],
            GatewayCall::Kick { guild_id: 10, user_id: 3, .. }
        ));
        let logs = store.log_entries();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind, ModLogKind::Kick);
        assert_eq!(logs[0].reason, "being rude");
        assert_eq!(logs[0].issuer_id, 2);
    }

    #[tokio::test]
    async fn issuer_below_target_is_refused_before_any_effect() {
        let (store, gateway, service) = service();
        let mut cx = cx();
        cx.target.rank.top_role_position = 80;

        let err = service.kick(&cx, "nope").await.unwrap_err();
        assert_eq!(err, ActionError::MemberPerm);
        assert!(gateway.calls().is_empty());
        assert!(store.log_entries().is_empty());
    }

    #[tokio::test]
    async fn bot_below_target_is_refused() {
        let (_, gateway, service) = service();
        let mut cx = cx();
        cx.issuer.top_role_position = 100;
        cx.target.rank.top_role_position = 95;

        let err = service.ban(&cx, 0, "nope").await.unwrap_err();
        assert_eq!(err, ActionError::BotPerm);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn timeout_refuses_active_timeout() {
        let (_, gateway, service) = service();
        let mut cx = cx();
        cx.target.timeout_until = Some(Utc::now() + Duration::hours(1));

        let err = service
            .timeout(&cx, Utc::now() + Duration::hours(2), "again")
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::AlreadyTimeout);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn expired_timeout_does_not_block_a_new_one() {
        let (_, gateway, service) = service();
        let mut cx = cx();
        cx.target.timeout_until = Some(Utc::now() - Duration::hours(1));

        service
            .timeout(&cx, Utc::now() + Duration::hours(2), "fresh")
            .await
            .unwrap();
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn untimeout_requires_active_timeout() {
        let (_, _, service) = service();
        let err = service.untimeout(&cx(), "clear").await.unwrap_err();
        assert_eq!(err, ActionError::NoTimeout);
    }

    #[tokio::test]
    async fn softban_bans_then_unbans_and_logs_once() {
        let (store, gateway, service) = service();
        service.softban(&cx(), "cleanup").await.unwrap();

        let calls = gateway.calls();
        assert!(matches!(
            calls[0],
            GatewayCall::Ban {
                delete_message_days: SOFTBAN_DELETE_DAYS,
                ..
            }
        ));
        assert!(matches!(calls[1], GatewayCall::Unban { .. }));
        let logs = store.log_entries();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind, ModLogKind::Softban);
    }

    #[tokio::test]
    async fn voice_actions_require_voice_state() {
        let (_, _, service) = service();
        assert_eq!(
            service.voice_mute(&cx(), "m").await.unwrap_err(),
            ActionError::NoVoice
        );
        assert_eq!(
            service.disconnect(&cx(), "d").await.unwrap_err(),
            ActionError::NoVoice
        );
    }

    #[tokio::test]
    async fn voice_mute_guards_current_state() {
        let (_, _, service) = service();
        let mut cx = cx();
        cx.target.voice = Some(VoiceInfo {
            channel_id: 7,
            muted: true,
            deafened: false,
        });
        assert_eq!(
            service.voice_mute(&cx, "m").await.unwrap_err(),
            ActionError::AlreadyMuted
        );
        assert_eq!(
            service.undeafen(&cx, "u").await.unwrap_err(),
            ActionError::NotDeafened
        );
    }

    #[tokio::test]
    async fn move_member_refuses_same_channel_and_missing_connect() {
        let (_, _, service) = service();
        let mut cx = cx();
        cx.target.voice = Some(VoiceInfo {
            channel_id: 7,
            muted: false,
            deafened: false,
        });
        assert_eq!(
            service.move_member(&cx, 7, true, "mv").await.unwrap_err(),
            ActionError::AlreadyInChannel
        );
        assert_eq!(
            service.move_member(&cx, 8, false, "mv").await.unwrap_err(),
            ActionError::TargetPerm
        );
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_and_skips_the_log() {
        let (store, _, _) = service();
        let gateway = Arc::new(RecordingGateway {
            fail_with: Some("boom".into()),
            ..Default::default()
        });
        let service = ActionService::new(Arc::clone(&store), gateway);

        let err = service.kick(&cx(), "r").await.unwrap_err();
        assert!(matches!(err, ActionError::Gateway(_)));
        assert!(store.log_entries().is_empty());
    }

    #[tokio::test]
    async fn warn_increments_and_reports() {
        let (store, _, service) = service();
        let outcome = service.warn(&cx(), "first").await.unwrap();
        assert_eq!(outcome.warnings, 1);
        assert!(outcome.escalated.is_none());

        let record = store.member_record(10, 3).await.unwrap();
        assert_eq!(record.warnings, 1);
        assert_eq!(store.log_entries()[0].kind, ModLogKind::Warn);
    }

    #[tokio::test]
    async fn warn_ceiling_escalates_as_bot_and_resets() {
        let (store, gateway, service) = service();
        store
            .save_guild_settings(
                10,
                &GuildSettings {
                    max_warn_limit: 2,
                    max_warn_action: EscalationAction::Kick,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        service.warn(&cx(), "one").await.unwrap();
        let outcome = service.warn(&cx(), "two").await.unwrap();

        assert_eq!(outcome.warnings, 2);
        assert_eq!(outcome.escalated, Some(EscalationAction::Kick));
        // The escalation is issued by the bot itself.
        assert!(matches!(
            gateway.calls().last(),
            Some(GatewayCall::Kick { user_id: 3, .. })
        ));
        let kick_log = store
            .log_entries()
            .into_iter()
            .find(|e| e.kind == ModLogKind::Kick)
            .unwrap();
        assert_eq!(kick_log.issuer_id, 99);
        assert_eq!(kick_log.reason, "Max warnings reached");

        let record = store.member_record(10, 3).await.unwrap();
        assert_eq!(record.warnings, 0);
    }

    #[tokio::test]
    async fn warn_ceiling_escalation_failure_still_resets_counter() {
        let store = Arc::new(MemStore::new());
        let gateway = Arc::new(RecordingGateway {
            fail_with: Some("api down".into()),
            ..Default::default()
        });
        let service = ActionService::new(Arc::clone(&store), gateway);
        store
            .save_guild_settings(
                10,
                &GuildSettings {
                    max_warn_limit: 1,
                    max_warn_action: EscalationAction::Ban,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = service.warn(&cx(), "only").await.unwrap();
        assert!(outcome.escalated.is_none());
        let record = store.member_record(10, 3).await.unwrap();
        assert_eq!(record.warnings, 0);
    }

    // ========================================================================
    // PURGE
    // ========================================================================

    fn snap(id: u64, author_id: u64, content: &str) -> MessageSnapshot {
        MessageSnapshot {
            id,
            author_id,
            author_is_bot: false,
            content: content.into(),
            has_attachment: false,
            created_at: Utc::now(),
            deletable: true,
        }
    }

    fn purge_req(filter: PurgeFilter, amount: usize, messages: Vec<MessageSnapshot>) -> PurgeRequest {
        PurgeRequest {
            guild_id: 10,
            channel_id: 77,
            issuer_id: 2,
            issuer_tag: "mod#0001".into(),
            issuer_can_manage: true,
            bot_can_manage: true,
            filter,
            amount,
            messages,
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn purge_validates_amount_bounds() {
        let (_, _, service) = service();
        let err = service
            .purge(&purge_req(PurgeFilter::All, 0, vec![snap(1, 5, "x")]))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::InvalidAmount);

        let err = service
            .purge(&purge_req(
                PurgeFilter::All,
                MAX_PURGE_AMOUNT + 1,
                vec![snap(1, 5, "x")],
            ))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::InvalidAmount);
    }

    #[tokio::test]
    async fn purge_filters_and_logs_aggregate() {
        let (store, gateway, service) = service();
        let messages = vec![
            snap(1, 5, "hello"),
            snap(2, 6, "see https://example.com now"),
            snap(3, 5, "plain"),
            snap(4, 7, "also www.example.org"),
        ];

        let deleted = service
            .purge(&purge_req(PurgeFilter::Link, 10, messages))
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        assert!(matches!(
            &gateway.calls()[0],
            GatewayCall::BulkDelete { channel_id: 77, message_ids } if *message_ids == vec![2, 4]
        ));
        let logs = store.log_entries();
        assert_eq!(logs[0].kind, ModLogKind::Purge);
        assert_eq!(logs[0].reason, "Message purge (LINK)");
        assert_eq!(logs[0].deleted_count, Some(2));
        assert_eq!(logs[0].channel_id, Some(77));
    }

    #[tokio::test]
    async fn purge_skips_messages_outside_the_window() {
        let (_, _, service) = service();
        let mut old = snap(1, 5, "ancient");
        old.created_at = Utc::now() - Duration::days(PURGE_WINDOW_DAYS + 1);

        let err = service
            .purge(&purge_req(PurgeFilter::All, 10, vec![old]))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::NoMessages);
    }

    #[tokio::test]
    async fn purge_single_own_message_deletes_directly_without_audit() {
        let (store, gateway, service) = service();
        // Issuer id 2 owns the only matching message.
        let err = service
            .purge(&purge_req(PurgeFilter::All, 10, vec![snap(9, 2, "mine")]))
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::NoMessages);
        assert!(matches!(
            gateway.calls()[0],
            GatewayCall::DeleteMessage {
                channel_id: 77,
                message_id: 9
            }
        ));
        assert!(store.log_entries().is_empty());
    }

    #[tokio::test]
    async fn purge_requires_manage_permissions() {
        let (_, _, service) = service();
        let mut req = purge_req(PurgeFilter::All, 5, vec![snap(1, 5, "x")]);
        req.issuer_can_manage = false;
        assert_eq!(service.purge(&req).await.unwrap_err(), ActionError::MemberPerm);

        let mut req = purge_req(PurgeFilter::All, 5, vec![snap(1, 5, "x")]);
        req.bot_can_manage = false;
        assert_eq!(service.purge(&req).await.unwrap_err(), ActionError::BotPerm);
    }

    #[tokio::test]
    async fn purge_token_filter_is_case_insensitive() {
        let (_, _, service) = service();
        let deleted = service
            .purge(&purge_req(
                PurgeFilter::Token("SPAM".into()),
                10,
                vec![snap(1, 5, "this is spam indeed"), snap(2, 5, "clean")],
            ))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }
}
