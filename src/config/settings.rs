//! Bot settings loaded from an optional TOML file and the environment.
//!
//! The file is read first and environment variables override it, so a deployment
//! can keep static values in `academy-bot.toml` and inject secrets through `.env`.
//!
//! ```toml
//! bot_token = "..."
//! admin_ids = ["123456789012345678"]
//! api_base_url = "https://academy.beer"
//! command_prefix = "!"
//! database_url = "sqlite://data/academy.sqlite?mode=rwc"
//! announce_channel_id = 123456789012345678
//! fura_template = "fura_template.png"
//! fura_font = "DejaVuSans.ttf"
//! fura_user_id = 123456789012345678
//! ```

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings file used when `ACADEMY_BOT_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "academy-bot.toml";
/// Academy instance used when no API URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://academy.beer";
/// Prefix that marks a chat message as a command.
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
/// Repository the version command links commits into.
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/beeracademy/discord-bot";
/// Picture the fura command writes on.
pub const DEFAULT_FURA_TEMPLATE: &str = "fura_template.png";
/// Font the fura command writes with.
pub const DEFAULT_FURA_FONT: &str = "DejaVuSans.ttf";

/// Raw contents of the settings file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Discord bot token
    pub bot_token: Option<String>,
    /// Discord user IDs allowed to run admin commands
    pub admin_ids: Vec<String>,
    /// Base URL of the academy API
    pub api_base_url: Option<String>,
    /// Command prefix
    pub command_prefix: Option<String>,
    /// `SeaORM` database URL
    pub database_url: Option<String>,
    /// Git commit the binary was built from
    pub commit_hash: Option<String>,
    /// Repository URL used to build commit links
    pub repository_url: Option<String>,
    /// Channel that receives the startup announcement
    pub announce_channel_id: Option<u64>,
    /// Path of the fura template picture
    pub fura_template: Option<String>,
    /// Path of the fura font
    pub fura_font: Option<String>,
    /// Discord user whose plain messages are rendered as fura pictures
    pub fura_user_id: Option<u64>,
}

/// Fully resolved bot settings.
#[derive(Clone)]
pub struct Settings {
    /// Discord bot token
    pub bot_token: String,
    /// Discord user IDs allowed to run admin commands
    pub admin_ids: BTreeSet<String>,
    /// Base URL of the academy API, without trailing slash
    pub api_base_url: String,
    /// Command prefix, never empty
    pub command_prefix: String,
    /// `SeaORM` database URL
    pub database_url: String,
    /// Git commit the binary was built from
    pub commit_hash: Option<String>,
    /// Repository URL used to build commit links
    pub repository_url: String,
    /// Channel that receives the startup announcement
    pub announce_channel_id: Option<u64>,
    /// Path of the fura template picture
    pub fura_template: PathBuf,
    /// Path of the fura font
    pub fura_font: PathBuf,
    /// Discord user whose plain messages are rendered as fura pictures
    pub fura_user_id: Option<u64>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &"<redacted>")
            .field("admin_ids", &self.admin_ids)
            .field("api_base_url", &self.api_base_url)
            .field("command_prefix", &self.command_prefix)
            .field("database_url", &self.database_url)
            .field("commit_hash", &self.commit_hash)
            .field("repository_url", &self.repository_url)
            .field("announce_channel_id", &self.announce_channel_id)
            .field("fura_template", &self.fura_template)
            .field("fura_font", &self.fura_font)
            .field("fura_user_id", &self.fura_user_id)
            .finish()
    }
}

impl Settings {
    /// Loads settings from the settings file (if present) and the process environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var("ACADEMY_BOT_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file = read_file_settings(&path)?;
        let settings = Self::from_sources(file, |key| std::env::var(key).ok())?;
        info!(
            "Loaded settings: prefix '{}', {} admin(s), API at {}",
            settings.command_prefix,
            settings.admin_ids.len(),
            settings.api_base_url
        );
        Ok(settings)
    }

    /// Merges file settings with values looked up through `env`; `env` wins.
    pub fn from_sources<F>(file: FileSettings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, from_file: Option<String>| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .or(from_file)
        };

        let bot_token = pick("DISCORD_BOT_TOKEN", file.bot_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: "DISCORD_BOT_TOKEN is required".to_string(),
            })?;

        let admin_ids = match env("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(raw.split([',', ' ']))?,
            None => parse_admin_ids(file.admin_ids.iter().map(String::as_str))?,
        };

        let command_prefix = pick("COMMAND_PREFIX", file.command_prefix)
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());
        if command_prefix.trim().is_empty() {
            return Err(Error::Config {
                message: "command prefix cannot be empty".to_string(),
            });
        }

        let api_base_url = pick("ACADEMY_API_URL", file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let announce_channel_id =
            discord_id(&env, "ANNOUNCE_CHANNEL_ID")?.or(file.announce_channel_id);
        let fura_user_id = discord_id(&env, "FURA_USER_ID")?.or(file.fura_user_id);

        let settings = Self {
            bot_token,
            admin_ids,
            api_base_url,
            command_prefix,
            database_url: pick("DATABASE_URL", file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            commit_hash: pick("GIT_COMMIT_HASH", file.commit_hash),
            repository_url: pick("REPOSITORY_URL", file.repository_url)
                .unwrap_or_else(|| DEFAULT_REPOSITORY_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            announce_channel_id,
            fura_template: pick("FURA_TEMPLATE", file.fura_template)
                .unwrap_or_else(|| DEFAULT_FURA_TEMPLATE.to_string())
                .into(),
            fura_font: pick("FURA_FONT", file.fura_font)
                .unwrap_or_else(|| DEFAULT_FURA_FONT.to_string())
                .into(),
            fura_user_id,
        };
        debug!("Resolved settings: {settings:?}");
        Ok(settings)
    }

    /// Whether `chat_user_id` is on the admin allow-list.
    #[must_use]
    pub fn is_admin(&self, chat_user_id: &str) -> bool {
        self.admin_ids.contains(chat_user_id)
    }

    /// Whether plain messages from `chat_user_id` trigger the fura command.
    #[must_use]
    pub fn is_fura_user(&self, chat_user_id: &str) -> bool {
        self.fura_user_id
            .is_some_and(|id| id.to_string() == chat_user_id)
    }

    /// Link to the commit the bot is running, if the commit is known.
    #[must_use]
    pub fn version_url(&self) -> Option<String> {
        self.commit_hash
            .as_ref()
            .map(|hash| format!("{}/commit/{hash}", self.repository_url))
    }
}

/// Reads the settings file, returning empty settings when it does not exist.
pub fn read_file_settings<P: AsRef<Path>>(path: P) -> Result<FileSettings> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No settings file at {path:?}, using environment only");
        return Ok(FileSettings::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read settings file {path:?}: {e}"),
    })?;
    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings file {path:?}: {e}"),
    })
}

/// Parses the Discord id in env var `key`, if it is set.
fn discord_id<F>(env: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            raw.parse::<u64>().map_err(|e| Error::Config {
                message: format!("{key} '{raw}' is not a Discord id: {e}"),
            })
        })
        .transpose()
}

fn parse_admin_ids<'a, I>(ids: I) -> Result<BTreeSet<String>>
where
    I: Iterator<Item = &'a str>,
{
    ids.map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .map(|_| id.to_string())
                .map_err(|e| Error::Config {
                    message: format!("admin id '{id}' is not a Discord user id: {e}"),
                })
        })
        .collect()
}
