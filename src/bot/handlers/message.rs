//! Chat message handling.

use crate::{
    bot::BotData,
    core::{Incoming, Reply},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Reply used when a command handler panics.
const HANDLER_CRASHED: &str = "Something went wrong while running that command.";

/// Runs the command in `message`, if any, and posts the reply.
///
/// Plain messages from the fura user are drawn as fura pictures. Messages from
/// bots are ignored. The dispatcher runs on its own task so a
/// panicking handler only loses that one command.
#[instrument(skip_all, fields(author = %message.author.id, channel = %message.channel_id))]
pub async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    let author_id = message.author.id.to_string();
    if message.author.bot || !data.dispatcher.wants(&message.content, &author_id) {
        return Ok(());
    }

    let _typing = message.channel_id.start_typing(&ctx.http);

    let channel_name = if message.guild_id.is_some() {
        message.channel_id.name(ctx).await.ok()
    } else {
        None
    };
    let incoming = Incoming::new(message.content.clone(), author_id, channel_name);

    let dispatcher = Arc::clone(&data.dispatcher);
    let reply = match tokio::spawn(async move { dispatcher.dispatch(&incoming).await }).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return Ok(()),
        Err(e) => {
            error!("Command handler crashed: {e}");
            Reply::Text(HANDLER_CRASHED.to_string())
        }
    };

    message
        .channel_id
        .send_message(&ctx.http, outgoing_message(&reply))
        .await?;

    if let Reply::Restart(_) = reply {
        info!("Shutting down for restart");
        framework.shard_manager().shutdown_all().await;
    }
    Ok(())
}

/// Builds the chat message for `reply`.
///
/// Only user mentions ping; `@everyone`, `@here` and role mentions in echoed
/// text render without notifying anyone.
pub fn outgoing_message(reply: &Reply) -> serenity::CreateMessage {
    let message = match reply {
        Reply::Text(text) | Reply::Restart(text) => serenity::CreateMessage::new().content(text),
        Reply::Image { file_name, png } => serenity::CreateMessage::new()
            .add_file(serenity::CreateAttachment::bytes(png.clone(), file_name.clone())),
    };
    message.allowed_mentions(serenity::CreateAllowedMentions::new().all_users(true))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{Dispatcher, academy::MockAcademyApi};
    use crate::test_utils::{init_test_tracing, setup_test_db, test_settings};
    use serde_json::json;

    #[tokio::test]
    async fn test_echoed_everyone_does_not_ping() -> Result<()> {
        init_test_tracing();
        let dispatcher =
            Dispatcher::new(MockAcademyApi::new(), setup_test_db().await?, test_settings(&[]));

        let reply = dispatcher
            .dispatch(&Incoming::new("!d @everyone @here", "200", None))
            .await
            .unwrap();
        assert!(reply.text().contains("@everyone"));

        let body = serde_json::to_value(outgoing_message(&reply)).unwrap();
        assert_eq!(body["content"], json!(reply.text()));
        assert_eq!(body["allowed_mentions"]["parse"], json!(["users"]));
        Ok(())
    }

    #[test]
    fn test_picture_reply_is_an_attachment() {
        let reply = Reply::Image {
            file_name: "fura.png".to_string(),
            png: vec![0x89, b'P', b'N', b'G'],
        };
        let body = serde_json::to_value(outgoing_message(&reply)).unwrap();
        assert!(body.get("content").is_none_or(serde_json::Value::is_null));
        assert_eq!(body["allowed_mentions"]["parse"], json!(["users"]));
    }
}
