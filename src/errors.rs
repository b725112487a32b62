//! Unified error types for the academy bot.
//!
//! Every fallible operation in the crate returns [`Result`]. Handler errors are
//! turned into a single chat reply at the dispatcher boundary; only startup
//! errors (missing configuration, unreachable database) end the process.

use thiserror::Error;

/// All errors produced by the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Any failure reported by the database layer.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The command token does not name a registered command.
    #[error("Unknown command: {name}")]
    UnknownCommand {
        /// The token as typed by the user
        name: String,
    },

    /// The command exists but its arguments could not be parsed.
    #[error("Invalid arguments, usage: {usage}")]
    InvalidArguments {
        /// Usage line of the command
        usage: String,
    },

    /// The chat user has no linked game account.
    #[error("User {chat_user_id} is not linked to an academy account")]
    NotLinked {
        /// Chat platform identity of the caller
        chat_user_id: String,
    },

    /// The chat user already has a linked game account.
    #[error("User is already linked to academy account {game_account_id}")]
    AlreadyLinked {
        /// The account the user is currently linked to
        game_account_id: String,
    },

    /// The game account is linked to somebody else.
    #[error("Academy account {game_account_id} is already linked to {chat_user_id}")]
    AccountTaken {
        /// The requested game account
        game_account_id: String,
        /// Chat user currently holding the account
        chat_user_id: String,
    },

    /// The academy account id is not a single plain path segment.
    #[error("Invalid academy account id: {account_id:?}")]
    InvalidAccountId {
        /// The id as supplied
        account_id: String,
    },

    /// No game id was given and none could be derived from the channel.
    #[error("No game id given")]
    MissingGameId,

    /// The game account does not take part in the requested game.
    #[error("Account {game_account_id} is not in game {game_id}")]
    NotInGame {
        /// Requested game
        game_id: u64,
        /// Account looked up in the game
        game_account_id: String,
    },

    /// The academy API could not be reached (network error or timeout).
    #[error("Academy API unavailable: {message}")]
    UpstreamUnavailable {
        /// Transport level detail
        message: String,
    },

    /// The academy API answered with a failure or an unreadable body.
    #[error("Academy API error (status {status:?}): {message}")]
    UpstreamError {
        /// HTTP status if one was received
        status: Option<u16>,
        /// Response or decoding detail
        message: String,
    },

    /// The caller is not on the admin allow-list.
    #[error("Permission denied")]
    PermissionDenied,

    /// The expression evaluator rejected the input.
    #[error("Evaluation error: {message}")]
    Eval {
        /// Parser or runtime message
        message: String,
    },

    /// Players could not be distributed into games.
    #[error("{message}")]
    Distribution {
        /// User facing explanation
        message: String,
    },

    /// Loading the template or font, or encoding the picture, failed.
    #[error("Image error: {message}")]
    Image {
        /// What went wrong
        message: String,
    },

    /// I/O error, e.g. while reading the settings file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure while writing a reply into a buffer.
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Serenity/Poise framework error.
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
