//! Discord gateway event handlers
//!
//! This module routes gateway events to the bot: chat messages go to the command
//! dispatcher, ready events refresh the presence.

/// Chat message handling
pub mod message;

use crate::{bot::BotData, errors::Error};
use poise::serenity_prelude as serenity;
use tracing::info;

/// Presence shown while the bot is connected.
pub const PRESENCE_TEXT: &str = "Waiting for new players: https://academy.beer/";

/// Entry point for every gateway event.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("{} is connected", data_about_bot.user.name);
            ctx.set_presence(
                Some(serenity::ActivityData::playing(PRESENCE_TEXT)),
                serenity::OnlineStatus::Online,
            );
        }
        serenity::FullEvent::Message { new_message } => {
            message::handle_message(ctx, new_message, framework, data).await?;
        }
        _ => {}
    }
    Ok(())
}
