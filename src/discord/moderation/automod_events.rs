// Message-event adapter for the automod pipeline. Turns a gateway message
// into plain facts, runs the review, and carries out the visible follow-up:
// deleting the message, notifying the member and posting to the log channel.

use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::time::Instant;
use tracing::warn;

use crate::core::moderation::{
    ActionContext, MemberRank, MessageFacts, ModerationStore, StrikeReport, TargetState,
    VoiceInfo,
};
use crate::discord::commands::moderation::{guild_permissions, top_role_position};
use crate::discord::{Data, Error};

const MOD_PERMS: &[serenity::Permissions] = &[
    serenity::Permissions::KICK_MEMBERS,
    serenity::Permissions::BAN_MEMBERS,
    serenity::Permissions::MANAGE_GUILD,
];

pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
) -> Result<(), Error> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    // Permission flags come from the gateway cache; keep the guard inside a
    // sync block so it never crosses an await.
    let (bot_can_manage, author_guild_mod, author_channel_mod) = {
        let bot_id = ctx.cache.current_user().id;
        match ctx.cache.guild(guild_id) {
            Some(guild) => {
                let channel = guild.channels.get(&msg.channel_id);
                let author = guild.members.get(&msg.author.id);
                let bot = guild.members.get(&bot_id);

                let bot_can_manage = match (channel, bot) {
                    (Some(channel), Some(bot)) => guild
                        .user_permissions_in(channel, bot)
                        .contains(serenity::Permissions::MANAGE_MESSAGES),
                    _ => false,
                };
                let author_channel_mod = match (channel, author) {
                    (Some(channel), Some(author)) => guild
                        .user_permissions_in(channel, author)
                        .contains(serenity::Permissions::MANAGE_MESSAGES),
                    _ => false,
                };
                let author_guild_mod = author
                    .map(|m| {
                        let perms = guild.member_permissions(m);
                        MOD_PERMS.iter().any(|p| perms.contains(*p))
                    })
                    .unwrap_or(false);

                (bot_can_manage, author_guild_mod, author_channel_mod)
            }
            None => (false, false, false),
        }
    };

    let facts = MessageFacts {
        guild_id: guild_id.get(),
        channel_id: msg.channel_id.get(),
        message_id: msg.id.get(),
        author_id: msg.author.id.get(),
        content: msg.content.clone(),
        member_mentions: msg.mentions.len() as u32,
        user_mentions: msg.mentions.len() as u32,
        role_mentions: msg.mention_roles.len() as u32,
        mentions_everyone: msg.mention_everyone,
        attachments: msg.attachments.len() as u32,
        deletable: bot_can_manage,
        bot_can_manage_messages: bot_can_manage,
        author_is_guild_mod: author_guild_mod,
        author_is_channel_mod: author_channel_mod,
    };

    let Some(verdict) = data.automod.review(&facts, Instant::now()).await? else {
        return Ok(());
    };
    if verdict.outcome.is_clean() {
        return Ok(());
    }

    if verdict.outcome.delete && facts.deletable {
        if let Err(e) = msg.delete(&ctx.http).await {
            warn!("failed to delete struck message: {e}");
        } else if let Err(e) = msg
            .channel_id
            .say(&ctx.http, "> Auto-Moderation! Message deleted")
            .await
        {
            warn!("failed to post deletion notice: {e}");
        }
    }

    if verdict.outcome.strikes > 0 {
        let cx = bot_action_context(ctx, guild_id, msg.author.id).await?;
        if let Some(report) = data.automod.register_strikes(&facts, &verdict, &cx).await? {
            notify_member(ctx, msg, &verdict.outcome.violations, &report).await;
            post_log_embed(ctx, data, msg, &verdict.outcome.violations, &report).await;
        }
    }

    Ok(())
}

/// Snapshot for an escalation issued on the bot's own authority.
async fn bot_action_context(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    target_id: serenity::UserId,
) -> Result<ActionContext, Error> {
    let guild = ctx.http.get_guild(guild_id).await?;
    let bot_id = ctx.cache.current_user().id;
    let bot_member = ctx.http.get_member(guild_id, bot_id).await?;
    let target_member = ctx.http.get_member(guild_id, target_id).await?;

    let voice = {
        ctx.cache.guild(guild_id).and_then(|g| {
            g.voice_states.get(&target_id).and_then(|vs| {
                vs.channel_id.map(|channel| VoiceInfo {
                    channel_id: channel.get(),
                    muted: vs.mute,
                    deafened: vs.deaf,
                })
            })
        })
    };

    let bot_rank = MemberRank {
        member_id: bot_id.get(),
        top_role_position: top_role_position(&guild, &bot_member.roles),
    };
    Ok(ActionContext {
        guild_id: guild_id.get(),
        owner_id: guild.owner_id.get(),
        issuer: bot_rank.clone(),
        issuer_tag: ctx.cache.current_user().tag(),
        bot: bot_rank,
        target: TargetState {
            rank: MemberRank {
                member_id: target_id.get(),
                top_role_position: top_role_position(&guild, &target_member.roles),
            },
            timeout_until: target_member
                .communication_disabled_until
                .as_ref()
                .and_then(|ts| chrono::DateTime::from_timestamp(ts.unix_timestamp(), 0)),
            voice,
        },
    })
}

fn violation_lines(violations: &[crate::core::moderation::Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("• {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// DM the struck member. Best-effort; members with closed DMs are skipped.
async fn notify_member(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    violations: &[crate::core::moderation::Violation],
    report: &StrikeReport,
) {
    let mut description = format!(
        "You received **{}** strike(s) in **{}** ({}/{}):\n{}",
        report.added,
        msg.guild_id
            .and_then(|id| ctx.cache.guild(id).map(|g| g.name.clone()))
            .unwrap_or_else(|| "this server".to_string()),
        report.total,
        report.ceiling,
        violation_lines(violations)
    );
    if let Some(action) = report.escalated {
        description.push_str(&format!("\n\nStrike limit reached: **{action}**"));
    }

    let embed = serenity::CreateEmbed::new()
        .title("⚠️ Auto-Moderation")
        .description(description)
        .color(0xFEE75C);
    if let Err(e) = msg
        .author
        .dm(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await
    {
        warn!(user_id = msg.author.id.get(), "failed to DM strike notice: {e}");
    }
}

/// Mirror the strike into the guild's log channel, when one is configured.
async fn post_log_embed(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
    violations: &[crate::core::moderation::Violation],
    report: &StrikeReport,
) {
    let Some(guild_id) = msg.guild_id else {
        return;
    };
    let settings = match data.store.guild_settings(guild_id.get()).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!("failed to load guild settings for log embed: {e}");
            return;
        }
    };
    let Some(logs_channel) = settings.logs_channel else {
        return;
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("Automod strike")
        .color(0xED4245)
        .field("Member", format!("<@{}>", msg.author.id.get()), true)
        .field("Channel", format!("<#{}>", msg.channel_id.get()), true)
        .field(
            "Strikes",
            format!("+{} ({}/{})", report.added, report.total, report.ceiling),
            true,
        )
        .field("Violations", violation_lines(violations), false);
    if let Ok(ts) = serenity::Timestamp::from_unix_timestamp(Utc::now().timestamp()) {
        embed = embed.timestamp(ts);
    }
    if let Some(action) = report.escalated {
        embed = embed.field("Escalation", action.to_string(), true);
    }

    if let Err(e) = serenity::ChannelId::new(logs_channel)
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await
    {
        warn!("failed to post strike log embed: {e}");
    }
}
