// Invite tracking commands.

use crate::core::moderation::{InviteRank, ModerationStore};
use crate::discord::commands::moderation::{Context, Error};
use poise::serenity_prelude as serenity;

/// Show how many members someone has invited.
#[poise::command(slash_command, guild_only)]
pub async fn invites(
    ctx: Context<'_>,
    #[description = "Member to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    if target.bot {
        ctx.say("Bots don't invite people! 🤖").await?;
        return Ok(());
    }

    let record = ctx
        .data()
        .store
        .member_record(guild_id.get(), target.id.get())
        .await?;
    let inv = &record.invites;

    let embed = serenity::CreateEmbed::new()
        .title(format!("Invites of {}", target.name))
        .color(0x57F287)
        .thumbnail(target.face())
        .field("Total", format!("**{}**", inv.effective()), true)
        .field("Tracked", inv.tracked.to_string(), true)
        .field("Bonus", inv.added.to_string(), true)
        .field("Fake", inv.fake.to_string(), true)
        .field("Left", inv.left.to_string(), true);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Grant or remove bonus invites for a member.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn addinvites(
    ctx: Context<'_>,
    #[description = "Member to credit"] user: serenity::User,
    #[description = "Invites to add (negative to remove)"]
    #[min = -1000]
    #[max = 1000]
    amount: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let record = ctx
        .data()
        .invites
        .add_invites(guild_id.get(), user.id.get(), amount)
        .await?;
    ctx.say(format!(
        "{} now has **{}** effective invites",
        user.name,
        record.invites.effective()
    ))
    .await?;
    Ok(())
}

/// Configure a role reward for reaching an invite count.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn inviterank(
    ctx: Context<'_>,
    #[description = "Role to grant"] role: serenity::Role,
    #[description = "Invites required; omit to remove the rank"]
    #[min = 1]
    #[max = 10000]
    invites: Option<i64>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let mut settings = ctx.data().store.guild_settings(guild_id.get()).await?;
    settings.invite_ranks.retain(|r| r.role_id != role.id.get());

    let reply = match invites {
        Some(invites) => {
            settings.invite_ranks.push(InviteRank {
                invites,
                role_id: role.id.get(),
            });
            format!("Members get **{}** at {} invites", role.name, invites)
        }
        None => format!("Removed the invite rank for **{}**", role.name),
    };
    ctx.data()
        .store
        .save_guild_settings(guild_id.get(), &settings)
        .await?;
    ctx.say(reply).await?;
    Ok(())
}
