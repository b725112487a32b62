//! Account link store - Associates chat users with academy accounts.
//!
//! A chat user holds at most one academy account and an academy account belongs to at
//! most one chat user. Writes run inside a database transaction that checks for an
//! existing link before inserting; the unique indexes on both columns catch any
//! insert that races past the check.

use crate::{
    entities::{Link, link},
    errors::{Error, Result},
};
use sea_orm::{Set, SqlErr, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Links `chat_user_id` to `game_account_id`.
///
/// # Errors
/// * [`Error::AlreadyLinked`] if the chat user already has a link; the existing link is kept.
/// * [`Error::AccountTaken`] if another chat user holds the academy account.
#[instrument(skip(db))]
pub async fn link_account(
    db: &DatabaseConnection,
    chat_user_id: &str,
    game_account_id: &str,
) -> Result<link::Model> {
    let txn = db.begin().await?;

    if let Some(conflict) = link_conflict(&txn, chat_user_id, game_account_id).await? {
        debug!("Refusing to link {chat_user_id}: {conflict}");
        return Err(conflict);
    }

    let model = link::ActiveModel {
        chat_user_id: Set(chat_user_id.to_string()),
        game_account_id: Set(game_account_id.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = match model.insert(&txn).await {
        Ok(created) => created,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            warn!("Concurrent link for {chat_user_id} lost the race: {e}");
            txn.rollback().await?;
            // the winning insert is committed by now, so it shows which column clashed
            return Err(link_conflict(db, chat_user_id, game_account_id)
                .await?
                .unwrap_or_else(|| e.into()));
        }
        Err(e) => return Err(e.into()),
    };

    txn.commit().await?;
    info!("Linked {chat_user_id} to academy account {game_account_id}");
    Ok(created)
}

/// The error a new link from `chat_user_id` to `game_account_id` would run into.
///
/// A link held by the chat user wins over a link held on the academy account.
pub async fn link_conflict<C>(
    db: &C,
    chat_user_id: &str,
    game_account_id: &str,
) -> Result<Option<Error>>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_link(db, chat_user_id).await? {
        return Ok(Some(Error::AlreadyLinked {
            game_account_id: existing.game_account_id,
        }));
    }
    Ok(find_chat_user(db, game_account_id)
        .await?
        .map(|holder| Error::AccountTaken {
            game_account_id: game_account_id.to_string(),
            chat_user_id: holder,
        }))
}

/// Removes the link of `chat_user_id` and returns it.
///
/// # Errors
/// [`Error::NotLinked`] if the chat user has no link.
#[instrument(skip(db))]
pub async fn unlink_account(db: &DatabaseConnection, chat_user_id: &str) -> Result<link::Model> {
    let txn = db.begin().await?;

    let existing = find_link(&txn, chat_user_id)
        .await?
        .ok_or_else(|| Error::NotLinked {
            chat_user_id: chat_user_id.to_string(),
        })?;

    Link::delete_by_id(existing.id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "Unlinked {chat_user_id} from academy account {}",
        existing.game_account_id
    );
    Ok(existing)
}

/// Returns the academy account linked to `chat_user_id`.
///
/// # Errors
/// [`Error::NotLinked`] if the chat user has no link.
pub async fn resolve_account<C>(db: &C, chat_user_id: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    find_link(db, chat_user_id)
        .await?
        .map(|link| link.game_account_id)
        .ok_or_else(|| Error::NotLinked {
            chat_user_id: chat_user_id.to_string(),
        })
}

/// Finds the link of `chat_user_id`, if any.
pub async fn find_link<C>(db: &C, chat_user_id: &str) -> Result<Option<link::Model>>
where
    C: ConnectionTrait,
{
    Link::find()
        .filter(link::Column::ChatUserId.eq(chat_user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the chat user holding `game_account_id`, if any.
pub async fn find_chat_user<C>(db: &C, game_account_id: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    Ok(Link::find()
        .filter(link::Column::GameAccountId.eq(game_account_id))
        .one(db)
        .await?
        .map(|link| link.chat_user_id))
}
