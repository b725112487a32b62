//! Command dispatcher - Turns chat messages into replies.
//!
//! The dispatcher owns everything a command needs: the registry, the academy client,
//! the link store connection and the settings. It is independent of Discord so the
//! whole command surface can be exercised in tests with a mocked academy API.
//!
//! Every failure is turned into exactly one reply at this boundary; a failing command
//! never affects the next one.

use crate::{
    config::Settings,
    core::{
        academy::{
            AcademyApi, GameStatus, PlayerStats,
            client::is_valid_account_id,
            distribute::{self, MAX_GAME_SIZE, SEARCH_TIMEOUT},
            models::ACE,
        },
        eval,
        format::{TextTable, code_block, escape_markdown, inline_code, mention, plural},
        fura::{self, FuraRenderer},
        link,
        registry::{Category, CommandDescriptor, CommandKind, CommandRegistry},
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::{fmt::Write, sync::Arc};
use tracing::{debug, error, info, instrument, warn};

/// Channel names of the form `academy_<game id>` belong to a game.
pub const GAME_CHANNEL_PREFIX: &str = "academy_";

/// A chat message as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    /// Raw message text
    pub content: String,
    /// Chat user id of the author
    pub author_id: String,
    /// Name of the channel the message was posted in, `None` for direct messages
    pub channel_name: Option<String>,
}

impl Incoming {
    /// Creates a message posted in `channel_name`.
    pub fn new(
        content: impl Into<String>,
        author_id: impl Into<String>,
        channel_name: Option<String>,
    ) -> Self {
        Self {
            content: content.into(),
            author_id: author_id.into(),
            channel_name,
        }
    }
}

/// What the bot should do in response to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Post the text in the channel of the command
    Text(String),
    /// Post the text, then shut down so the supervisor can relaunch the bot
    Restart(String),
    /// Post a PNG picture as an attachment
    Image {
        /// Attachment name
        file_name: String,
        /// Encoded picture
        png: Vec<u8>,
    },
}

impl Reply {
    /// Text to post.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Restart(text) => text,
            Self::Image { .. } => "",
        }
    }
}

/// A message split into command token and argument text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Command name or alias, as typed
    pub token: &'a str,
    /// Everything after the token, trimmed
    pub args: &'a str,
}

/// Splits `content` into an [`Invocation`] if it starts with `prefix`.
///
/// Whitespace directly after the prefix means the message is not a command.
#[must_use]
pub fn parse_invocation<'a>(prefix: &str, content: &'a str) -> Option<Invocation<'a>> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (token, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    Some(Invocation {
        token,
        args: args.trim(),
    })
}

/// Routes messages to command handlers.
#[derive(Debug)]
pub struct Dispatcher<A> {
    registry: CommandRegistry,
    api: A,
    db: DatabaseConnection,
    settings: Arc<Settings>,
}

impl<A: AcademyApi> Dispatcher<A> {
    /// Creates a dispatcher with the default command table.
    pub fn new(api: A, db: DatabaseConnection, settings: Arc<Settings>) -> Self {
        Self {
            registry: CommandRegistry::default(),
            api,
            db,
            settings,
        }
    }

    /// Whether `content` is a command.
    pub fn is_command(&self, content: &str) -> bool {
        parse_invocation(&self.settings.command_prefix, content).is_some()
    }

    /// Whether a message from `author_id` gets a reply at all.
    ///
    /// Besides commands, any text from the fura user is answered with a fura picture.
    pub fn wants(&self, content: &str, author_id: &str) -> bool {
        self.is_command(content) || self.is_fura_trigger(content, author_id)
    }

    fn is_fura_trigger(&self, content: &str, author_id: &str) -> bool {
        self.settings.is_fura_user(author_id) && !content.trim().is_empty()
    }

    /// Handles one message. Returns `None` when the message needs no reply.
    #[instrument(skip(self, message), fields(author = %message.author_id))]
    pub async fn dispatch(&self, message: &Incoming) -> Option<Reply> {
        let result = match parse_invocation(&self.settings.command_prefix, &message.content) {
            Some(invocation) => {
                debug!("Dispatching {:?}", invocation.token);
                self.execute(invocation, message).await
            }
            None if self.is_fura_trigger(&message.content, &message.author_id) => {
                debug!("Drawing fura for plain message");
                self.fura(message.content.trim()).await
            }
            None => return None,
        };

        Some(result.unwrap_or_else(|e| Reply::Text(self.describe_error(&e, &message.author_id))))
    }

    async fn execute(&self, invocation: Invocation<'_>, message: &Incoming) -> Result<Reply> {
        let command = self
            .registry
            .lookup(invocation.token)
            .ok_or_else(|| Error::UnknownCommand {
                name: invocation.token.to_string(),
            })?;

        if command.category == Category::Admin && !self.settings.is_admin(&message.author_id) {
            warn!(
                "User {} tried to use admin command {}",
                message.author_id, command.name
            );
            return Err(Error::PermissionDenied);
        }

        let caller = message.author_id.as_str();
        let args = invocation.args;
        match command.kind {
            CommandKind::Link => self.link(command, args, caller).await,
            CommandKind::Unlink => self.unlink(caller).await,
            CommandKind::Status => self.status(command, args, message).await,
            CommandKind::Level => self.level(command, args, message).await,
            CommandKind::Table => self.table(command, args, message).await,
            CommandKind::Distribute => self.distribute(command, args).await,
            CommandKind::Version => Ok(Reply::Text(self.version())),
            CommandKind::Test => Ok(Reply::Text(format!("Test {}", mention(caller)))),
            CommandKind::Fura if args.is_empty() => Err(self.usage_error(command)),
            CommandKind::Fura => self.fura(args).await,
            CommandKind::Help => Ok(Reply::Text(
                self.registry.help_text(&self.settings.command_prefix)?,
            )),
            CommandKind::Eval => Ok(Reply::Text(eval_reply(args)?)),
            CommandKind::Restart => {
                info!("Restart requested by {caller}");
                Ok(Reply::Restart("Restarting...".to_string()))
            }
        }
    }

    async fn link(&self, command: &CommandDescriptor, args: &str, caller: &str) -> Result<Reply> {
        let mut parts = args.split_whitespace();
        let (Some(account_id), None) = (parts.next(), parts.next()) else {
            return Err(self.usage_error(command));
        };
        if !is_valid_account_id(account_id) {
            return Err(Error::InvalidAccountId {
                account_id: account_id.to_string(),
            });
        }

        let user = match self.api.get_user(account_id).await {
            Ok(user) => user,
            Err(Error::UpstreamError {
                status: Some(404), ..
            }) => {
                return Ok(Reply::Text(format!(
                    "{} Couldn't get user data! Does the user exist?",
                    mention(caller)
                )));
            }
            Err(e) => return Err(e),
        };

        // "01" and "1" may name the same user; links store the id the platform reports
        let account_id = user
            .id
            .as_deref()
            .filter(|id| is_valid_account_id(id))
            .unwrap_or(account_id);
        link::link_account(&self.db, caller, account_id).await?;
        Ok(Reply::Text(format!(
            "{} is now linked with {} on academy.",
            mention(caller),
            escape_markdown(&user.username)
        )))
    }

    async fn unlink(&self, caller: &str) -> Result<Reply> {
        link::unlink_account(&self.db, caller).await?;
        Ok(Reply::Text(format!(
            "{} is now no longer linked to any academy user.",
            mention(caller)
        )))
    }

    async fn status(
        &self,
        command: &CommandDescriptor,
        args: &str,
        message: &Incoming,
    ) -> Result<Reply> {
        let game_id = self.resolve_game_id(command, args, message)?;
        let caller_link = link::find_link(&self.db, &message.author_id).await?;
        let status = self.api.get_status(game_id).await?;

        let mut text = self.describe_status(&status).await?;
        if let Some(player) = caller_link.and_then(|l| {
            status
                .game
                .player_stats
                .iter()
                .find(|p| p.id == l.game_account_id)
        }) {
            write!(
                text,
                "\n\n{} you are on: {}",
                mention(&message.author_id),
                level_info(player)
            )?;
        }
        Ok(Reply::Text(text))
    }

    async fn level(
        &self,
        command: &CommandDescriptor,
        args: &str,
        message: &Incoming,
    ) -> Result<Reply> {
        let game_id = self.resolve_game_id(command, args, message)?;
        let account_id = link::resolve_account(&self.db, &message.author_id).await?;
        let level = self.api.get_level(game_id, &account_id).await?;
        Ok(Reply::Text(format!(
            "{}:\n{}",
            mention(&message.author_id),
            level_info(&level.player)
        )))
    }

    async fn table(
        &self,
        command: &CommandDescriptor,
        args: &str,
        message: &Incoming,
    ) -> Result<Reply> {
        let game_id = self.resolve_game_id(command, args, message)?;
        let table = self.api.get_table(game_id).await?;

        let mut header = vec!["\nRound".to_string()];
        header.extend(table.players.iter().map(|p| {
            format!(
                "{}\n{}\n{}",
                p.username,
                plural(p.full_beers, "beer"),
                plural(p.extra_sips, "sip")
            )
        }));
        let mut text_table = TextTable::new(header);
        for (round, cards) in table.rounds.iter().enumerate() {
            let mut row = vec![(round + 1).to_string()];
            row.extend(
                cards
                    .iter()
                    .map(|card| card.map_or_else(String::new, |value| value.to_string())),
            );
            text_table.add_row(row);
        }
        Ok(Reply::Text(code_block("", &text_table.draw()?)))
    }

    async fn distribute(&self, command: &CommandDescriptor, args: &str) -> Result<Reply> {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        let groups = distribute::parse_groups(&tokens);
        if groups.is_empty() {
            return Err(self.usage_error(command));
        }

        let games = tokio::task::spawn_blocking(move || {
            distribute::distribute(groups, SEARCH_TIMEOUT)
        })
        .await
        .map_err(|e| Error::Distribution {
            message: format!("Distribution task failed: {e}"),
        })??;

        let mut text = format!(
            "Partitioned players into {} games (at most {MAX_GAME_SIZE} per game):",
            games.len()
        );
        for (i, players) in games.iter().enumerate() {
            write!(text, "\nGame {}: {}", i + 1, players.join(", "))?;
        }
        Ok(Reply::Text(text))
    }

    async fn fura(&self, text: &str) -> Result<Reply> {
        let template = self.settings.fura_template.clone();
        let font = self.settings.fura_font.clone();
        let text = text.to_string();
        let png = tokio::task::spawn_blocking(move || {
            FuraRenderer::load(&template, &font)?.render(&text)
        })
        .await
        .map_err(|e| Error::Image {
            message: format!("Render task failed: {e}"),
        })??;
        Ok(Reply::Image {
            file_name: fura::FILE_NAME.to_string(),
            png,
        })
    }

    fn version(&self) -> String {
        self.settings.version_url().map_or_else(
            || {
                format!(
                    "I'm currently running an unknown version (v{}).",
                    env!("CARGO_PKG_VERSION")
                )
            },
            |url| format!("I'm currently running the following version: {url}"),
        )
    }

    /// Game id from the first argument, else from a game channel name.
    fn resolve_game_id(
        &self,
        command: &CommandDescriptor,
        args: &str,
        message: &Incoming,
    ) -> Result<u64> {
        if let Some(arg) = args.split_whitespace().next() {
            return arg.parse().map_err(|_| self.usage_error(command));
        }
        message
            .channel_name
            .as_deref()
            .and_then(|name| name.strip_prefix(GAME_CHANNEL_PREFIX))
            .and_then(|id| id.parse().ok())
            .ok_or(Error::MissingGameId)
    }

    async fn describe_status(&self, status: &GameStatus) -> Result<String> {
        let game = &status.game;
        if game.player_stats.is_empty() {
            return Ok(format!("Game {} has no players yet.", game.id));
        }

        let mut text = String::new();
        if let (Some(card), Some(previous)) = (game.cards.last(), status.previous_player()) {
            let name = self.player_name(previous).await?;
            match (card.value, card.chug_duration_ms) {
                (ACE, None) => {
                    write!(text, "{name} just got an ace, so they have to chug!")?;
                }
                (ACE, Some(ms)) => {
                    #[allow(clippy::cast_precision_loss)]
                    let seconds = ms as f64 / 1000.0;
                    writeln!(
                        text,
                        "{name} just finished chugging with time {seconds} seconds.\n"
                    )?;
                }
                (value, _) => writeln!(text, "{name} just got a {value}.\n")?,
            }
        }

        if status.is_complete() {
            if !status.ace_pending() {
                write!(text, "All cards have been drawn in game {}.", game.id)?;
                if let Some(description) = game.description.as_deref().filter(|d| !d.is_empty()) {
                    write!(text, "\nDescription: {}", escape_markdown(description))?;
                }
            }
        } else if !status.ace_pending()
            && let Some(current) = status.current_player()
        {
            let name = self.player_name(current).await?;
            write!(text, "Now it's {name}'s turn:\n{}", level_info(current))?;
        }

        Ok(text.trim_end().to_string())
    }

    /// Mention for linked players, escaped username otherwise.
    async fn player_name(&self, player: &PlayerStats) -> Result<String> {
        Ok(link::find_chat_user(&self.db, &player.id)
            .await?
            .map_or_else(|| escape_markdown(&player.username), |id| mention(&id)))
    }

    fn usage_error(&self, command: &CommandDescriptor) -> Error {
        Error::InvalidArguments {
            usage: command.usage_line(&self.settings.command_prefix),
        }
    }

    /// The single user facing message for a failed command.
    fn describe_error(&self, error: &Error, caller: &str) -> String {
        let prefix = &self.settings.command_prefix;
        let who = mention(caller);
        match error {
            Error::UnknownCommand { name } => {
                debug!("Unknown command {name:?}");
                format!(
                    "Unknown command {}. Type `{prefix}help` for a list of commands.",
                    inline_code(&format!("{prefix}{name}"))
                )
            }
            Error::InvalidArguments { usage } => format!("{who} usage: `{usage}`"),
            Error::NotLinked { .. } => format!(
                "{who} you need to `{prefix}link` your discord account with your academy account."
            ),
            Error::InvalidAccountId { account_id } => format!(
                "{who} {} is not a valid academy user id.",
                inline_code(account_id)
            ),
            Error::AlreadyLinked { game_account_id } => format!(
                "{who} you are already linked to academy user {game_account_id}. \
                 Use `{prefix}unlink` first."
            ),
            Error::AccountTaken {
                game_account_id,
                chat_user_id,
            } => format!(
                "{who} academy user {game_account_id} is already linked to {}.",
                mention(chat_user_id)
            ),
            Error::MissingGameId => format!(
                "{who} you either have to provide the game id as an argument \
                 or use the command in the associated chat."
            ),
            Error::NotInGame { game_id, .. } => {
                format!("{who} doesn't seem to be in game {game_id}.")
            }
            Error::UpstreamUnavailable { .. } | Error::UpstreamError { .. } => {
                warn!("Academy request failed: {error}");
                "Couldn't reach academy right now, try again later.".to_string()
            }
            Error::PermissionDenied => {
                format!("{who} you are not allowed to use that command.")
            }
            Error::Eval { message } => code_block("", &format!("Error: {message}")),
            Error::Distribution { message } => format!("{who} {message}"),
            Error::Image { .. } => {
                error!("Fura failed: {error}");
                "Couldn't draw that picture right now.".to_string()
            }
            Error::Config { .. }
            | Error::Database(_)
            | Error::Io(_)
            | Error::Format(_)
            | Error::Framework(_) => {
                error!("Command failed: {error}");
                "Something went wrong while running that command.".to_string()
            }
        }
    }
}

/// "To be on level they have to have drunk ..." line for `player`.
#[must_use]
pub fn level_info(player: &PlayerStats) -> String {
    format!(
        "To be on level they have to have drunk {} full {} and {}.",
        player.full_beers,
        if player.full_beers == 1 { "beer" } else { "beers" },
        plural(player.extra_sips, "sip")
    )
}

/// Strips surrounding whitespace and backticks, evaluates and formats the result.
fn eval_reply(args: &str) -> Result<String> {
    let source = args.trim().trim_matches('`').trim();
    if source.is_empty() {
        return Ok("After stripping `'s, stmts can't be empty.".to_string());
    }
    let value = eval::evaluate(source)?;
    Ok(code_block("", &value))
}
