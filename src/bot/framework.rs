use crate::{
    bot::{BotData, handlers},
    config::Settings,
    core::{Dispatcher, academy::AcademyClient},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Error while handling event {}: {:?}",
                event.snake_case_name(),
                error
            );
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Posts the startup announcement, if an announce channel is configured.
async fn announce_startup(http: &serenity::Http, settings: &Settings) {
    let Some(channel_id) = settings.announce_channel_id else {
        return;
    };
    let version = settings
        .version_url()
        .unwrap_or_else(|| format!("v{}", env!("CARGO_PKG_VERSION")));
    if let Err(e) = serenity::ChannelId::new(channel_id)
        .say(http, format!("Just started up, running version: {version}"))
        .await
    {
        warn!("Failed to post startup announcement: {e}");
    }
}

/// Connects to Discord and runs until the client stops.
///
/// A `restart` command shuts all shards down, which makes this return `Ok(())`.
#[instrument(skip_all)]
pub async fn run_bot(settings: Arc<Settings>, db: DatabaseConnection) -> Result<()> {
    let api = AcademyClient::new(&settings.api_base_url)?;
    let dispatcher = Arc::new(Dispatcher::new(api, db, Arc::clone(&settings)));
    let data = BotData::new(dispatcher, Arc::clone(&settings));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                announce_startup(&ctx.http, &data.settings).await;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&settings.bot_token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;

    info!("Bot client stopped");
    Ok(())
}
