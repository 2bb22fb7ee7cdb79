// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::invites::InviteService;
use crate::core::moderation::{ActionService, AutomodService, SWEEP_INTERVAL};
use crate::discord::automod_events;
use crate::discord::gateway::SerenityModGateway;
use crate::discord::invite_events;
use crate::discord::{Data, Error};
use crate::infra::error_webhook::ErrorWebhook;
use crate::infra::moderation::SqliteModStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
/// This is where the automod pipeline and invite tracking hook in.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = automod_events::handle_message(ctx, data, new_message).await {
                tracing::error!("Error handling automod message: {}", e);
                data.webhook.report("Automod message handler", &e.to_string()).await;
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = invite_events::handle_member_join(ctx, data, new_member).await {
                tracing::error!("Error handling member join: {}", e);
                data.webhook.report("Invite join handler", &e.to_string()).await;
            }
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            if let Err(e) = invite_events::handle_member_leave(data, *guild_id, user).await {
                tracing::error!("Error handling member leave: {}", e);
                data.webhook.report("Invite leave handler", &e.to_string()).await;
            }
        }
        serenity::FullEvent::InviteCreate { data: event } => {
            invite_events::handle_invite_create(data, event);
        }
        serenity::FullEvent::InviteDelete { data: event } => {
            invite_events::handle_invite_delete(data, event);
        }
        serenity::FullEvent::CacheReady { guilds } => {
            for guild_id in guilds {
                if let Err(e) = invite_events::prime_guild(ctx, data, *guild_id).await {
                    tracing::warn!("Failed to prime invites for guild {}: {}", guild_id, e);
                }
            }
        }
        serenity::FullEvent::GuildCreate { guild, .. } => {
            if let Err(e) = invite_events::prime_guild(ctx, data, guild.id).await {
                tracing::warn!("Failed to prime invites for guild {}: {}", guild.id, e);
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory for SQLite files");
    let moderation_db_path = format!("{}/moderation.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let store = Arc::new(
        SqliteModStore::new(&moderation_db_path)
            .await
            .expect("Failed to initialize SQLite store"),
    );
    let webhook = Arc::new(ErrorWebhook::from_env());

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_INVITES
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::moderation::warn(),
                discord::commands::moderation::timeout(),
                discord::commands::moderation::untimeout(),
                discord::commands::moderation::kick(),
                discord::commands::moderation::softban(),
                discord::commands::moderation::ban(),
                discord::commands::moderation::unban(),
                discord::commands::moderation::vmute(),
                discord::commands::moderation::vunmute(),
                discord::commands::moderation::deafen(),
                discord::commands::moderation::undeafen(),
                discord::commands::moderation::disconnect(),
                discord::commands::moderation::move_user(),
                discord::commands::moderation::purge(),
                discord::commands::moderation::modlogs(),
                discord::commands::moderation::automod(),
                discord::commands::moderation::maxwarn(),
                discord::commands::invites::invites(),
                discord::commands::invites::addinvites(),
                discord::commands::invites::inviterank(),
            ],
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                println!("🤖 Bot is starting up...");

                // The gateway adapter needs the REST client, which only
                // exists once the framework is up; wire the services here.
                let gateway = Arc::new(SerenityModGateway::new(ctx.http.clone()));
                let actions = Arc::new(ActionService::new(
                    Arc::clone(&store),
                    Arc::clone(&gateway),
                ));
                let automod = Arc::new(AutomodService::new(
                    Arc::clone(&store),
                    Arc::clone(&actions),
                ));
                let invites = Arc::new(InviteService::new(
                    Arc::clone(&store),
                    Arc::clone(&gateway),
                ));

                let data = Data {
                    actions,
                    automod: Arc::clone(&automod),
                    invites,
                    store: Arc::clone(&store),
                    webhook: Arc::clone(&webhook),
                };

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                println!("✅ Commands registered!");
                println!("🚀 Bot is ready!");

                // Background sweep so the anti-spam cache stays bounded.
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(SWEEP_INTERVAL).await;
                        automod.antispam().sweep(std::time::Instant::now());
                        tracing::debug!("anti-spam cache swept");
                    }
                });

                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
