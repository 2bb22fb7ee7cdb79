// Event adapters for invite tracking: snapshot priming, join/leave
// attribution and invite lifecycle events.

use chrono::Utc;
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::core::invites::InviteEntry;
use crate::discord::{Data, Error};

async fn fetch_invites(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Result<Vec<InviteEntry>, Error> {
    let invites = guild_id.invites(&ctx.http).await?;
    Ok(invites
        .into_iter()
        .map(|invite| InviteEntry {
            code: invite.code,
            uses: invite.uses as u32,
            max_uses: invite.max_uses as u32,
            inviter_id: invite.inviter.map(|u| u.id.get()).unwrap_or_default(),
            deleted_at: None,
        })
        .collect())
}

/// Seed the invite cache for a guild. Run at startup for every known guild
/// and again whenever the bot joins one.
pub async fn prime_guild(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
) -> Result<(), Error> {
    let invites = fetch_invites(ctx, guild_id).await?;
    info!(guild_id = guild_id.get(), count = invites.len(), "primed invite cache");
    data.invites.set_snapshot(guild_id.get(), invites);
    Ok(())
}

pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    let invites = fetch_invites(ctx, member.guild_id).await?;
    let attribution = data
        .invites
        .track_join(
            member.guild_id.get(),
            member.user.id.get(),
            member.user.bot,
            invites,
        )
        .await?;

    match attribution {
        Some(attribution) => info!(
            guild_id = member.guild_id.get(),
            member_id = member.user.id.get(),
            inviter_id = attribution.inviter_id,
            code = %attribution.code,
            "join attributed"
        ),
        None => info!(
            guild_id = member.guild_id.get(),
            member_id = member.user.id.get(),
            "join could not be attributed"
        ),
    }
    Ok(())
}

pub async fn handle_member_leave(
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) -> Result<(), Error> {
    data.invites
        .track_leave(guild_id.get(), user.id.get(), user.bot)
        .await?;
    Ok(())
}

pub fn handle_invite_create(data: &Data, event: &serenity::InviteCreateEvent) {
    let Some(guild_id) = event.guild_id else {
        return;
    };
    data.invites.handle_invite_create(
        guild_id.get(),
        InviteEntry {
            code: event.code.clone(),
            uses: event.uses as u32,
            max_uses: event.max_uses as u32,
            inviter_id: event.inviter.as_ref().map(|u| u.id.get()).unwrap_or_default(),
            deleted_at: None,
        },
    );
}

pub fn handle_invite_delete(data: &Data, event: &serenity::InviteDeleteEvent) {
    let Some(guild_id) = event.guild_id else {
        warn!("invite delete without guild id");
        return;
    };
    data.invites
        .handle_invite_delete(guild_id.get(), &event.code, Utc::now());
}
