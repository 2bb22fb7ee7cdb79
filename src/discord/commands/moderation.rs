// Moderation commands.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::invites::InviteService;
use crate::core::moderation::{
    ActionContext, ActionError, ActionService, AutomodService, EscalationAction, MemberRank,
    MessageSnapshot, ModLogKind, ModerationStore, PurgeFilter, PurgeRequest, TargetState,
    VoiceInfo,
};
use crate::discord::gateway::SerenityModGateway;
use crate::infra::error_webhook::ErrorWebhook;
use crate::infra::moderation::SqliteModStore;
use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude as serenity;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
use std::sync::Arc;

pub struct Data {
    pub actions: Arc<ActionService<SqliteModStore, SerenityModGateway>>,
    pub automod: Arc<AutomodService<SqliteModStore, SerenityModGateway>>,
    pub invites: Arc<InviteService<SqliteModStore, SerenityModGateway>>,
    pub store: Arc<SqliteModStore>,
    pub webhook: Arc<ErrorWebhook>,
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum EscalationChoice {
    #[name = "Timeout"]
    Timeout,
    #[name = "Kick"]
    Kick,
    #[name = "Softban"]
    Softban,
    #[name = "Ban"]
    Ban,
}

impl From<EscalationChoice> for EscalationAction {
    fn from(choice: EscalationChoice) -> Self {
        match choice {
            EscalationChoice::Timeout => EscalationAction::Timeout,
            EscalationChoice::Kick => EscalationAction::Kick,
            EscalationChoice::Softban => EscalationAction::Softban,
            EscalationChoice::Ban => EscalationAction::Ban,
        }
    }
}

#[derive(Debug, Clone, poise::ChoiceParameter)]
pub enum PurgeFilterChoice {
    #[name = "All"]
    All,
    #[name = "Bots"]
    Bot,
    #[name = "Links"]
    Link,
    #[name = "Attachments"]
    Attachment,
}

// ============================================================================
// CONTEXT ASSEMBLY
// ============================================================================

/// Guild-wide permissions of a member, resolved from their roles.
pub fn guild_permissions(
    guild: &serenity::PartialGuild,
    user_id: serenity::UserId,
    role_ids: &[serenity::RoleId],
) -> serenity::Permissions {
    if user_id == guild.owner_id {
        return serenity::Permissions::all();
    }
    // @everyone carries the guild id.
    let mut perms = guild
        .roles
        .get(&serenity::RoleId::new(guild.id.get()))
        .map(|r| r.permissions)
        .unwrap_or_default();
    for role_id in role_ids {
        if let Some(role) = guild.roles.get(role_id) {
            perms |= role.permissions;
        }
    }
    if perms.contains(serenity::Permissions::ADMINISTRATOR) {
        serenity::Permissions::all()
    } else {
        perms
    }
}

/// Highest role position a member holds; 0 with no roles (@everyone).
pub fn top_role_position(
    guild: &serenity::PartialGuild,
    role_ids: &[serenity::RoleId],
) -> i64 {
    role_ids
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .map(|r| r.position as i64)
        .max()
        .unwrap_or(0)
}

fn timestamp_to_utc(ts: &serenity::Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0)
}

/// Build the action-engine snapshot for a command invocation against a
/// guild member.
async fn action_context(
    ctx: Context<'_>,
    target: &serenity::User,
) -> Result<ActionContext, Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let guild = ctx.http().get_guild(guild_id).await?;

    let issuer_member = ctx
        .author_member()
        .await
        .ok_or("Could not resolve your guild membership")?;
    let target_member = ctx.http().get_member(guild_id, target.id).await?;
    let bot_id = ctx.cache().current_user().id;
    let bot_member = ctx.http().get_member(guild_id, bot_id).await?;

    // Voice state only lives in the gateway cache; scope the guard so it
    // never crosses an await.
    let voice = {
        ctx.guild().and_then(|g| {
            g.voice_states.get(&target.id).and_then(|vs| {
                vs.channel_id.map(|channel| VoiceInfo {
                    channel_id: channel.get(),
                    muted: vs.mute,
                    deafened: vs.deaf,
                })
            })
        })
    };

    Ok(ActionContext {
        guild_id: guild_id.get(),
        owner_id: guild.owner_id.get(),
        issuer: MemberRank {
            member_id: ctx.author().id.get(),
            top_role_position: top_role_position(&guild, &issuer_member.roles),
        },
        issuer_tag: ctx.author().tag(),
        bot: MemberRank {
            member_id: bot_id.get(),
            top_role_position: top_role_position(&guild, &bot_member.roles),
        },
        target: TargetState {
            rank: MemberRank {
                member_id: target.id.get(),
                top_role_position: top_role_position(&guild, &target_member.roles),
            },
            timeout_until: target_member
                .communication_disabled_until
                .as_ref()
                .and_then(timestamp_to_utc),
            voice,
        },
    })
}

async fn finish_action(
    ctx: Context<'_>,
    result: Result<(), ActionError>,
    success: String,
    kind: ModLogKind,
    target: &serenity::User,
    reason: &str,
) -> Result<(), Error> {
    match result {
        Ok(()) => {
            ctx.say(success).await?;
            post_log_channel(ctx, kind, target, reason).await;
        }
        Err(e) => {
            ctx.say(format!("❌ {e}")).await?;
        }
    }
    Ok(())
}

/// Best-effort mirror of a successful action into the guild's log channel.
async fn post_log_channel(
    ctx: Context<'_>,
    kind: ModLogKind,
    target: &serenity::User,
    reason: &str,
) {
    let Some(guild_id) = ctx.guild_id() else {
        return;
    };
    let settings = match ctx.data().store.guild_settings(guild_id.get()).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("failed to load guild settings for log embed: {e}");
            return;
        }
    };
    let Some(channel) = settings.logs_channel else {
        return;
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("Moderation: {kind}"))
        .color(0xED4245)
        .field("Member", format!("<@{}>", target.id.get()), true)
        .field("Moderator", ctx.author().tag(), true)
        .field("Reason", reason.to_string(), false);
    if let Err(e) = serenity::ChannelId::new(channel)
        .send_message(ctx.http(), serenity::CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!("failed to post action log embed: {e}");
    }
}

// ============================================================================
// PUNITIVE COMMANDS
// ============================================================================

/// Warn a member. Hitting the warning limit escalates automatically.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    match ctx.data().actions.warn(&cx, &reason).await {
        Ok(outcome) => {
            let mut msg = format!("⚠️ Warned {} ({} warnings)", user.name, outcome.warnings);
            if let Some(action) = outcome.escalated {
                msg.push_str(&format!("\nWarning limit reached, applied **{action}**"));
            }
            ctx.say(msg).await?;
            post_log_channel(ctx, ModLogKind::Warn, &user, &reason).await;
        }
        Err(e) => {
            ctx.say(format!("❌ {e}")).await?;
        }
    }
    Ok(())
}

/// Timeout a member for a number of minutes.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "Member to timeout"] user: serenity::User,
    #[description = "Duration in minutes"]
    #[min = 1]
    #[max = 40320]
    minutes: u32,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let until = Utc::now() + Duration::minutes(minutes as i64);
    let result = ctx.data().actions.timeout(&cx, until, &reason).await;
    finish_action(
        ctx,
        result,
        format!("⏳ Timed out {} for {} minutes", user.name, minutes),
        ModLogKind::Timeout,
        &user,
        &reason,
    )
    .await
}

/// Remove a member's timeout.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn untimeout(
    ctx: Context<'_>,
    #[description = "Member to release"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.untimeout(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("✅ Removed timeout from {}", user.name),
        ModLogKind::Untimeout,
        &user,
        &reason,
    )
    .await
}

/// Kick a member from the server.
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.kick(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("👢 Kicked {}", user.name),
        ModLogKind::Kick,
        &user,
        &reason,
    )
    .await
}

/// Softban a member: ban and immediately unban, wiping a week of messages.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn softban(
    ctx: Context<'_>,
    #[description = "Member to softban"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.softban(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("🔨 Softbanned {}", user.name),
        ModLogKind::Softban,
        &user,
        &reason,
    )
    .await
}

/// Ban a member from the server.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member to ban"] user: serenity::User,
    #[description = "Days of messages to delete (0-7)"]
    #[min = 0]
    #[max = 7]
    delete_days: Option<u8>,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx
        .data()
        .actions
        .ban(&cx, delete_days.unwrap_or(0), &reason)
        .await;
    finish_action(
        ctx,
        result,
        format!("🔨 Banned {}", user.name),
        ModLogKind::Ban,
        &user,
        &reason,
    )
    .await
}

/// Unban a user by id.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "User to unban"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    // The target is not a member, so there is no rank to snapshot.
    let cx = ActionContext {
        guild_id: guild_id.get(),
        owner_id: 0,
        issuer: MemberRank {
            member_id: ctx.author().id.get(),
            top_role_position: 0,
        },
        issuer_tag: ctx.author().tag(),
        bot: MemberRank {
            member_id: ctx.cache().current_user().id.get(),
            top_role_position: 0,
        },
        target: TargetState::member(MemberRank {
            member_id: user.id.get(),
            top_role_position: 0,
        }),
    };
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.unban(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("✅ Unbanned {}", user.name),
        ModLogKind::Unban,
        &user,
        &reason,
    )
    .await
}

// ============================================================================
// VOICE COMMANDS
// ============================================================================

/// Server-mute a member in voice.
#[poise::command(slash_command, guild_only, required_permissions = "MUTE_MEMBERS")]
pub async fn vmute(
    ctx: Context<'_>,
    #[description = "Member to mute"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.voice_mute(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("🔇 Voice muted {}", user.name),
        ModLogKind::VMute,
        &user,
        &reason,
    )
    .await
}

/// Remove a member's server mute.
#[poise::command(slash_command, guild_only, required_permissions = "MUTE_MEMBERS")]
pub async fn vunmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.voice_unmute(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("🔊 Voice unmuted {}", user.name),
        ModLogKind::VUnmute,
        &user,
        &reason,
    )
    .await
}

/// Deafen a member in voice.
#[poise::command(slash_command, guild_only, required_permissions = "DEAFEN_MEMBERS")]
pub async fn deafen(
    ctx: Context<'_>,
    #[description = "Member to deafen"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.deafen(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("🔇 Deafened {}", user.name),
        ModLogKind::Deafen,
        &user,
        &reason,
    )
    .await
}

/// Remove a member's deafen.
#[poise::command(slash_command, guild_only, required_permissions = "DEAFEN_MEMBERS")]
pub async fn undeafen(
    ctx: Context<'_>,
    #[description = "Member to undeafen"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.undeafen(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("🔊 Undeafened {}", user.name),
        ModLogKind::Undeafen,
        &user,
        &reason,
    )
    .await
}

/// Disconnect a member from voice.
#[poise::command(slash_command, guild_only, required_permissions = "MOVE_MEMBERS")]
pub async fn disconnect(
    ctx: Context<'_>,
    #[description = "Member to disconnect"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
    let result = ctx.data().actions.disconnect(&cx, &reason).await;
    finish_action(
        ctx,
        result,
        format!("🔌 Disconnected {}", user.name),
        ModLogKind::Disconnect,
        &user,
        &reason,
    )
    .await
}

/// Move a member to another voice channel.
#[poise::command(slash_command, guild_only, required_permissions = "MOVE_MEMBERS")]
pub async fn move_user(
    ctx: Context<'_>,
    #[description = "Member to move"] user: serenity::User,
    #[description = "Destination voice channel"]
    #[channel_types("Voice")]
    channel: serenity::GuildChannel,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let cx = action_context(ctx, &user).await?;
    let reason = reason.unwrap_or_else(|| "No reason provided".to_string());

    // Resolve whether the target may connect to the destination.
    let target_can_connect = {
        ctx.guild()
            .and_then(|g| {
                g.members.get(&user.id).map(|m| {
                    g.user_permissions_in(&channel, m)
                        .contains(serenity::Permissions::CONNECT)
                })
            })
            .unwrap_or(true)
    };

    let result = ctx
        .data()
        .actions
        .move_member(&cx, channel.id.get(), target_can_connect, &reason)
        .await;
    finish_action(
        ctx,
        result,
        format!("➡️ Moved {} to {}", user.name, channel.name),
        ModLogKind::Move,
        &user,
        &reason,
    )
    .await
}

// ============================================================================
// PURGE
// ============================================================================

/// Bulk-delete recent messages in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many matching messages to delete"]
    #[min = 1]
    #[max = 500]
    amount: u32,
    #[description = "Which messages to delete"] filter: Option<PurgeFilterChoice>,
    #[description = "Only messages containing this text"] token: Option<String>,
    #[description = "Only messages from this user"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    ctx.defer_ephemeral().await?;

    let filter = if let Some(user) = user {
        PurgeFilter::User(user.id.get())
    } else if let Some(token) = token {
        PurgeFilter::Token(token)
    } else {
        match filter {
            Some(PurgeFilterChoice::Bot) => PurgeFilter::Bot,
            Some(PurgeFilterChoice::Link) => PurgeFilter::Link,
            Some(PurgeFilterChoice::Attachment) => PurgeFilter::Attachment,
            _ => PurgeFilter::All,
        }
    };

    let guild = ctx.http().get_guild(guild_id).await?;
    let issuer_member = ctx
        .author_member()
        .await
        .ok_or("Could not resolve your guild membership")?;
    let bot_id = ctx.cache().current_user().id;
    let bot_member = ctx.http().get_member(guild_id, bot_id).await?;

    let issuer_can_manage = guild_permissions(&guild, ctx.author().id, &issuer_member.roles)
        .contains(serenity::Permissions::MANAGE_MESSAGES);
    let bot_can_manage = guild_permissions(&guild, bot_id, &bot_member.roles)
        .contains(serenity::Permissions::MANAGE_MESSAGES);

    let fetched = ctx
        .channel_id()
        .messages(ctx.http(), serenity::GetMessages::new().limit(100))
        .await?;
    let messages: Vec<MessageSnapshot> = fetched
        .iter()
        .map(|m| MessageSnapshot {
            id: m.id.get(),
            author_id: m.author.id.get(),
            author_is_bot: m.author.bot,
            content: m.content.clone(),
            has_attachment: !m.attachments.is_empty(),
            created_at: timestamp_to_utc(&m.timestamp).unwrap_or_else(Utc::now),
            deletable: true,
        })
        .collect();

    let request = PurgeRequest {
        guild_id: guild_id.get(),
        channel_id: ctx.channel_id().get(),
        issuer_id: ctx.author().id.get(),
        issuer_tag: ctx.author().tag(),
        issuer_can_manage,
        bot_can_manage,
        filter,
        amount: amount as usize,
        messages,
        now: Utc::now(),
    };

    match ctx.data().actions.purge(&request).await {
        Ok(deleted) => {
            ctx.say(format!("🧹 Deleted {deleted} messages")).await?;
            post_log_channel(
                ctx,
                ModLogKind::Purge,
                ctx.author(),
                &format!("Deleted {deleted} messages"),
            )
            .await;
        }
        Err(e) => {
            ctx.say(format!("❌ {e}")).await?;
        }
    }
    Ok(())
}

// ============================================================================
// AUDIT LOG
// ============================================================================

/// Show the most recent moderation history for a member.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn modlogs(
    ctx: Context<'_>,
    #[description = "Member to inspect"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let logs = ctx
        .data()
        .store
        .mod_logs(guild_id.get(), user.id.get(), 10)
        .await?;

    if logs.is_empty() {
        ctx.say(format!("No moderation history for {}", user.name))
            .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Moderation history of {}", user.name))
        .color(0xED4245);
    for entry in logs {
        embed = embed.field(
            format!("{} — {}", entry.kind, entry.at.format("%Y-%m-%d %H:%M")),
            format!("By {}\n{}", entry.issuer_tag, entry.reason),
            false,
        );
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configure the automoderation system.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("automod_status", "automod_toggle", "automod_strikes", "automod_rules")
)]
pub async fn automod(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current automod configuration.
#[poise::command(slash_command, guild_only, rename = "status")]
pub async fn automod_status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let config = ctx.data().store.automod_config(guild_id.get()).await?;

    let on_off = |b: bool| if b { "on" } else { "off" };
    let embed = serenity::CreateEmbed::new()
        .title("Automod configuration")
        .color(0x5865F2)
        .field("Enabled", on_off(config.enabled), true)
        .field("Debug", on_off(config.debug), true)
        .field(
            "Strikes",
            format!("{} → {}", config.strikes, config.action),
            true,
        )
        .field("Max mentions", config.max_mentions.to_string(), true)
        .field("Max role mentions", config.max_role_mentions.to_string(), true)
        .field(
            "Mass mention threshold",
            config.anti_massmention.to_string(),
            true,
        )
        .field("Max lines", config.max_lines.to_string(), true)
        .field("Anti attachments", on_off(config.anti_attachments), true)
        .field("Anti links", on_off(config.anti_links), true)
        .field("Anti spam", on_off(config.anti_spam), true)
        .field("Anti invites", on_off(config.anti_invites), true);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Enable or disable automod for this server.
#[poise::command(slash_command, guild_only, rename = "toggle")]
pub async fn automod_toggle(
    ctx: Context<'_>,
    #[description = "Turn automod on or off"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let mut config = ctx.data().store.automod_config(guild_id.get()).await?;
    config.enabled = enabled;
    ctx.data()
        .store
        .save_automod_config(guild_id.get(), &config)
        .await?;
    ctx.say(format!(
        "Automod is now **{}**",
        if enabled { "enabled" } else { "disabled" }
    ))
    .await?;
    Ok(())
}

/// Set the strike limit and what happens when it is reached.
#[poise::command(slash_command, guild_only, rename = "strikes")]
pub async fn automod_strikes(
    ctx: Context<'_>,
    #[description = "Strikes before action is taken"]
    #[min = 1]
    #[max = 100]
    limit: u32,
    #[description = "Action at the limit"] action: EscalationChoice,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let mut config = ctx.data().store.automod_config(guild_id.get()).await?;
    config.strikes = limit;
    config.action = action.into();
    ctx.data()
        .store
        .save_automod_config(guild_id.get(), &config)
        .await?;
    ctx.say(format!(
        "Members now receive **{}** after {limit} strikes",
        config.action
    ))
    .await?;
    Ok(())
}

/// Toggle the content rules.
#[poise::command(slash_command, guild_only, rename = "rules")]
#[allow(clippy::too_many_arguments)]
pub async fn automod_rules(
    ctx: Context<'_>,
    #[description = "Strike messages with links"] anti_links: Option<bool>,
    #[description = "Strike cross-channel link spam"] anti_spam: Option<bool>,
    #[description = "Strike Discord invites"] anti_invites: Option<bool>,
    #[description = "Strike messages with attachments"] anti_attachments: Option<bool>,
    #[description = "Maximum lines per message (0 disables)"] max_lines: Option<u32>,
    #[description = "Mass mention threshold (0 disables)"] mass_mentions: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let mut config = ctx.data().store.automod_config(guild_id.get()).await?;
    if let Some(v) = anti_links {
        config.anti_links = v;
    }
    if let Some(v) = anti_spam {
        config.anti_spam = v;
    }
    if let Some(v) = anti_invites {
        config.anti_invites = v;
    }
    if let Some(v) = anti_attachments {
        config.anti_attachments = v;
    }
    if let Some(v) = max_lines {
        config.max_lines = v;
    }
    if let Some(v) = mass_mentions {
        config.anti_massmention = v;
    }
    ctx.data()
        .store
        .save_automod_config(guild_id.get(), &config)
        .await?;
    ctx.say("Automod rules updated").await?;
    Ok(())
}

/// Set how many warnings a member may collect and what happens after.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn maxwarn(
    ctx: Context<'_>,
    #[description = "Warnings before action is taken"]
    #[min = 1]
    #[max = 50]
    limit: u32,
    #[description = "Action at the limit"] action: EscalationChoice,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let mut settings = ctx.data().store.guild_settings(guild_id.get()).await?;
    settings.max_warn_limit = limit;
    settings.max_warn_action = action.into();
    ctx.data()
        .store
        .save_guild_settings(guild_id.get(), &settings)
        .await?;
    ctx.say(format!(
        "Members now receive **{}** after {limit} warnings",
        settings.max_warn_action
    ))
    .await?;
    Ok(())
}
