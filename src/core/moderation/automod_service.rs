// Automod pipeline: gate, evaluate, register strikes, escalate.
//
// `review` decides whether a message is even subject to moderation and runs
// the rule evaluator; `register_strikes` persists the outcome and fires the
// configured escalation when the accumulated total reaches the ceiling.
// Deleting the offending message and notifying the member stay with the
// discord layer, which owns those surfaces.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::action_service::ActionService;
use super::antispam_cache::AntiSpamTracker;
use super::moderation_models::{
    ActionContext, AutomodConfig, AutomodVerdict, MessageFacts, ModLogEntry, ModLogKind,
    ModerationError, RuleOutcome, StrikeReport, Violation,
};
use super::patterns::{contains_discord_invite, contains_link};
use super::ports::{ModGateway, ModerationStore};

pub struct AutomodService<S: ModerationStore, G: ModGateway> {
    store: Arc<S>,
    actions: Arc<ActionService<S, G>>,
    antispam: AntiSpamTracker,
}

impl<S: ModerationStore, G: ModGateway> AutomodService<S, G> {
    pub fn new(store: Arc<S>, actions: Arc<ActionService<S, G>>) -> Self {
        Self {
            store,
            actions,
            antispam: AntiSpamTracker::new(),
        }
    }

    pub fn antispam(&self) -> &AntiSpamTracker {
        &self.antispam
    }

    /// Gate a message and evaluate it against the guild's rules.
    ///
    /// Returns `None` when the message is exempt: automod disabled, channel
    /// whitelisted, the bot cannot manage messages here, or the author is a
    /// guild or channel moderator.
    pub async fn review(
        &self,
        facts: &MessageFacts,
        now: Instant,
    ) -> Result<Option<AutomodVerdict>, ModerationError> {
        let config = self
            .store
            .automod_config(facts.guild_id)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        if !config.enabled
            || config.wh_channels.contains(&facts.channel_id)
            || !facts.bot_can_manage_messages
            || facts.author_is_guild_mod
            || facts.author_is_channel_mod
        {
            return Ok(None);
        }

        let outcome = self.evaluate(facts, &config, now);
        if config.debug {
            debug!(
                guild_id = facts.guild_id,
                channel_id = facts.channel_id,
                author_id = facts.author_id,
                strikes = outcome.strikes,
                delete = outcome.delete,
                "automod evaluation"
            );
        }

        Ok(Some(AutomodVerdict { outcome, config }))
    }

    /// Run every enabled rule over one message. Pure apart from the
    /// anti-spam cache, which records first occurrences as a side effect.
    pub fn evaluate(
        &self,
        facts: &MessageFacts,
        config: &AutomodConfig,
        now: Instant,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();

        if facts.member_mentions > config.max_mentions {
            outcome.violations.push(Violation::Mentions {
                found: facts.member_mentions,
                max: config.max_mentions,
            });
            outcome.strikes += 1;
        }

        if facts.role_mentions > config.max_role_mentions {
            outcome.violations.push(Violation::RoleMentions {
                found: facts.role_mentions,
                max: config.max_role_mentions,
            });
            outcome.strikes += 1;
        }

        if config.anti_massmention > 0 {
            if facts.mentions_everyone {
                outcome.violations.push(Violation::EveryoneMention);
                outcome.strikes += 1;
            }
            let combined = facts.user_mentions + facts.role_mentions;
            if combined > config.anti_massmention {
                outcome.violations.push(Violation::MassMentions {
                    found: combined,
                    threshold: config.anti_massmention,
                });
                outcome.strikes += 1;
            }
        }

        if config.max_lines > 0 {
            let lines = facts.content.split('\n').count() as u32;
            if lines > config.max_lines {
                outcome.violations.push(Violation::MaxLines {
                    found: lines,
                    max: config.max_lines,
                });
                outcome.strikes += 1;
                outcome.delete = true;
            }
        }

        if config.anti_attachments && facts.attachments > 0 {
            outcome.violations.push(Violation::Attachments);
            outcome.strikes += 1;
            outcome.delete = true;
        }

        if config.anti_links && contains_link(&facts.content) {
            outcome.violations.push(Violation::Links);
            outcome.strikes += 1;
            outcome.delete = true;
        }

        // The link rule subsumes both of these; only consult them when it is
        // off so a single link never earns multiple content strikes.
        if !config.anti_links {
            if config.anti_spam
                && contains_link(&facts.content)
                && self.antispam.observe(
                    facts.author_id,
                    facts.guild_id,
                    facts.channel_id,
                    &facts.content,
                    now,
                )
            {
                outcome.violations.push(Violation::Spam);
                outcome.strikes += 1;
                outcome.delete = true;
            }

            if config.anti_invites && contains_discord_invite(&facts.content) {
                outcome.violations.push(Violation::DiscordInvite);
                outcome.strikes += 1;
                outcome.delete = true;
            }
        }

        outcome
    }

    /// Persist strikes for a struck message and escalate at the ceiling.
    ///
    /// The audit append and the escalation are both best-effort: failing to
    /// record history never blocks the counter update, and a failed
    /// escalation is logged and swallowed. Returns `None` for a clean
    /// verdict.
    pub async fn register_strikes(
        &self,
        facts: &MessageFacts,
        verdict: &AutomodVerdict,
        cx: &ActionContext,
    ) -> Result<Option<StrikeReport>, ModerationError> {
        if verdict.outcome.strikes == 0 {
            return Ok(None);
        }

        let mut record = self
            .store
            .member_record(facts.guild_id, facts.author_id)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;
        record.strikes += verdict.outcome.strikes;
        let accumulated = record.strikes;

        let reason = verdict
            .outcome
            .violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        let entry = ModLogEntry {
            guild_id: facts.guild_id,
            target_id: facts.author_id,
            issuer_id: cx.bot.member_id,
            issuer_tag: cx.issuer_tag.clone(),
            reason,
            kind: ModLogKind::Strike,
            at: chrono::Utc::now(),
            channel_id: Some(facts.channel_id),
            deleted_count: None,
        };
        if let Err(e) = self.store.append_mod_log(&entry).await {
            warn!(guild_id = facts.guild_id, "failed to append strike log: {e}");
        }

        let mut escalated = None;
        if accumulated >= verdict.config.strikes {
            let action = verdict.config.action;
            match self
                .actions
                .apply_escalation(
                    &cx.with_bot_issuer(),
                    action,
                    "Automod: max strikes received",
                )
                .await
            {
                Ok(()) => escalated = Some(action),
                Err(e) => warn!(
                    guild_id = facts.guild_id,
                    target_id = facts.author_id,
                    "strike-ceiling escalation failed: {e}"
                ),
            }
            record.strikes = 0;
        }

        self.store
            .save_member_record(&record)
            .await
            .map_err(|e| ModerationError::Storage(e.to_string()))?;

        Ok(Some(StrikeReport {
            added: verdict.outcome.strikes,
            total: accumulated,
            ceiling: verdict.config.strikes,
            escalated,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::moderation_models::{EscalationAction, MemberRank, TargetState};
    use super::super::testutil::{GatewayCall, MemStore, RecordingGateway};
    use super::*;

    fn facts(content: &str) -> MessageFacts {
        MessageFacts {
            guild_id: 10,
            channel_id: 100,
            message_id: 1000,
            author_id: 3,
            content: content.into(),
            member_mentions: 0,
            user_mentions: 0,
            role_mentions: 0,
            mentions_everyone: false,
            attachments: 0,
            deletable: true,
            bot_can_manage_messages: true,
            author_is_guild_mod: false,
            author_is_channel_mod: false,
        }
    }

    fn bot_cx() -> ActionContext {
        ActionContext {
            guild_id: 10,
            owner_id: 1,
            issuer: MemberRank {
                member_id: 99,
                top_role_position: 90,
            },
            issuer_tag: "warden#0000".into(),
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

    fn setup() -> (
        Arc<MemStore>,
        Arc<RecordingGateway>,
        AutomodService<MemStore, RecordingGateway>,
    ) {
        let store = Arc::new(MemStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let actions = Arc::new(ActionService::new(Arc::clone(&store), Arc::clone(&gateway)));
        let service = AutomodService::new(Arc::clone(&store), actions);
        (store, gateway, service)
    }

    fn enabled_config() -> AutomodConfig {
        AutomodConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn disabled_automod_reviews_nothing() {
        let (_, _, service) = setup();
        let verdict = service.review(&facts("@everyone spam"), Instant::now()).await.unwrap();
        assert!(verdict.is_none());
    }

    #[tokio::test]
    async fn whitelisted_channel_and_moderators_are_exempt() {
        let (store, _, service) = setup();
        let mut config = enabled_config();
        config.wh_channels = vec![100];
        store.save_automod_config(10, &config).await.unwrap();
        assert!(service
            .review(&facts("x"), Instant::now())
            .await
            .unwrap()
            .is_none());

        store.save_automod_config(10, &enabled_config()).await.unwrap();
        let mut f = facts("x");
        f.author_is_channel_mod = true;
        assert!(service.review(&f, Instant::now()).await.unwrap().is_none());

        let mut f = facts("x");
        f.bot_can_manage_messages = false;
        assert!(service.review(&f, Instant::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clean_message_earns_no_strikes() {
        let (store, _, service) = setup();
        store.save_automod_config(10, &enabled_config()).await.unwrap();

        let verdict = service
            .review(&facts("just chatting"), Instant::now())
            .await
            .unwrap()
            .unwrap();
        assert!(verdict.outcome.is_clean());

        let report = service
            .register_strikes(&facts("just chatting"), &verdict, &bot_cx())
            .await
            .unwrap();
        assert!(report.is_none());
        assert_eq!(store.member_record(10, 3).await.unwrap().strikes, 0);
    }

    #[test]
    fn mention_checks_count_independently() {
        let (_, _, service) = setup();
        let mut config = enabled_config();
        config.max_mentions = 2;
        config.max_role_mentions = 1;
        config.anti_massmention = 3;

        let mut f = facts("hi");
        f.member_mentions = 3;
        f.user_mentions = 3;
        f.role_mentions = 2;
        f.mentions_everyone = true;

        let outcome = service.evaluate(&f, &config, Instant::now());
        assert_eq!(outcome.strikes, 4);
        assert!(outcome.violations.contains(&Violation::EveryoneMention));
        assert!(outcome
            .violations
            .contains(&Violation::MassMentions { found: 5, threshold: 3 }));
        // Mention violations alone never delete the message.
        assert!(!outcome.delete);
    }

    #[test]
    fn mass_mention_disabled_ignores_everyone_ping() {
        let (_, _, service) = setup();
        let config = enabled_config();
        let mut f = facts("hi");
        f.mentions_everyone = true;
        assert!(service.evaluate(&f, &config, Instant::now()).is_clean());
    }

    #[test]
    fn max_lines_strikes_and_deletes() {
        let (_, _, service) = setup();
        let mut config = enabled_config();
        config.max_lines = 3;

        let outcome = service.evaluate(&facts("a\nb\nc\nd"), &config, Instant::now());
        assert_eq!(outcome.strikes, 1);
        assert!(outcome.delete);
        assert_eq!(
            outcome.violations,
            vec![Violation::MaxLines { found: 4, max: 3 }]
        );

        let outcome = service.evaluate(&facts("a\nb\nc"), &config, Instant::now());
        assert!(outcome.is_clean());
    }

    #[test]
    fn anti_links_suppresses_spam_and_invite_checks() {
        let (_, _, service) = setup();
        let mut config = enabled_config();
        config.anti_links = true;
        config.anti_spam = true;
        config.anti_invites = true;

        let outcome = service.evaluate(
            &facts("join https://discord.gg/abc now"),
            &config,
            Instant::now(),
        );
        assert_eq!(outcome.strikes, 1);
        assert_eq!(outcome.violations, vec![Violation::Links]);
    }

    #[test]
    fn anti_spam_strikes_cross_channel_link_repeats() {
        let (_, _, service) = setup();
        let mut config = enabled_config();
        config.anti_spam = true;

        let now = Instant::now();
        let first = facts("look https://example.com/offer");
        assert!(service.evaluate(&first, &config, now).is_clean());

        let mut second = first.clone();
        second.channel_id = 101;
        let outcome = service.evaluate(&second, &config, now);
        assert_eq!(outcome.violations, vec![Violation::Spam]);
        assert!(outcome.delete);

        // Same channel repeat never counts as spam.
        let outcome = service.evaluate(&first, &config, now);
        assert!(outcome.is_clean());
    }

    #[test]
    fn anti_spam_ignores_plain_text_repeats() {
        let (_, _, service) = setup();
        let mut config = enabled_config();
        config.anti_spam = true;

        let now = Instant::now();
        service.evaluate(&facts("no url here"), &config, now);
        let mut second = facts("no url here");
        second.channel_id = 101;
        assert!(service.evaluate(&second, &config, now).is_clean());
    }

    #[test]
    fn anti_invites_strikes_invite_links() {
        let (_, _, service) = setup();
        let mut config = enabled_config();
        config.anti_invites = true;

        let outcome = service.evaluate(&facts("discord.gg/abc123"), &config, Instant::now());
        assert_eq!(outcome.violations, vec![Violation::DiscordInvite]);
        assert!(outcome.delete);
    }

    #[tokio::test]
    async fn strikes_accumulate_across_messages() {
        let (store, _, service) = setup();
        let mut config = enabled_config();
        config.max_lines = 1;
        store.save_automod_config(10, &config).await.unwrap();

        for _ in 0..2 {
            let f = facts("a\nb");
            let verdict = service.review(&f, Instant::now()).await.unwrap().unwrap();
            service
                .register_strikes(&f, &verdict, &bot_cx())
                .await
                .unwrap();
        }

        let record = store.member_record(10, 3).await.unwrap();
        assert_eq!(record.strikes, 2);
        let logs = store.log_entries();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|e| e.kind == ModLogKind::Strike));
        assert_eq!(logs[0].reason, "New Lines: 2/1");
    }

    #[tokio::test]
    async fn ceiling_fires_exactly_one_escalation_and_resets() {
        let (store, gateway, service) = setup();
        let mut config = enabled_config();
        config.max_lines = 1;
        config.strikes = 5;
        config.action = EscalationAction::Kick;
        store.save_automod_config(10, &config).await.unwrap();
        store
            .save_member_record(&{
                let mut r = crate::core::moderation::MemberRecord::new(10, 3);
                r.strikes = 4;
                r
            })
            .await
            .unwrap();

        let f = facts("a\nb");
        let verdict = service.review(&f, Instant::now()).await.unwrap().unwrap();
        let report = service
            .register_strikes(&f, &verdict, &bot_cx())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.total, 5);
        assert_eq!(report.ceiling, 5);
        assert_eq!(report.escalated, Some(EscalationAction::Kick));

        let kicks: Vec<_> = gateway
            .calls()
            .into_iter()
            .filter(|c| matches!(c, GatewayCall::Kick { .. }))
            .collect();
        assert_eq!(kicks.len(), 1);

        let kick_log = store
            .log_entries()
            .into_iter()
            .find(|e| e.kind == ModLogKind::Kick)
            .unwrap();
        assert_eq!(kick_log.reason, "Automod: max strikes received");
        assert_eq!(kick_log.issuer_id, 99);

        assert_eq!(store.member_record(10, 3).await.unwrap().strikes, 0);
    }

    #[tokio::test]
    async fn storage_failure_surfaces_from_review() {
        let store = Arc::new(MemStore {
            fail_with: Some("db locked".into()),
            ..Default::default()
        });
        let gateway = Arc::new(RecordingGateway::new());
        let actions = Arc::new(ActionService::new(Arc::clone(&store), gateway));
        let service = AutomodService::new(store, actions);

        let err = service.review(&facts("x"), Instant::now()).await.unwrap_err();
        assert!(matches!(err, ModerationError::Storage(_)));
    }

    #[tokio::test]
    async fn failed_escalation_still_resets_the_counter() {
        let store = Arc::new(MemStore::new());
        let gateway = Arc::new(RecordingGateway {
            fail_with: Some("api down".into()),
            ..Default::default()
        });
        let actions = Arc::new(ActionService::new(Arc::clone(&store), gateway));
        let service = AutomodService::new(Arc::clone(&store), actions);

        let mut config = enabled_config();
        config.max_lines = 1;
        config.strikes = 1;
        store.save_automod_config(10, &config).await.unwrap();

        let f = facts("a\nb");
        let verdict = service.review(&f, Instant::now()).await.unwrap().unwrap();
        let report = service
            .register_strikes(&f, &verdict, &bot_cx())
            .await
            .unwrap()
            .unwrap();

        assert!(report.escalated.is_none());
        assert_eq!(store.member_record(10, 3).await.unwrap().strikes, 0);
    }
}
