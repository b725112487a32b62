//! HTTP client for the academy API.
//!
//! [`AcademyApi`] is the seam the dispatcher talks to; [`AcademyClient`] implements it
//! over `reqwest`. Every call is a single best-effort request: transport failures and
//! timeouts become [`Error::UpstreamUnavailable`], non-success answers and unreadable
//! bodies become [`Error::UpstreamError`].

use crate::core::academy::models::{CardTable, GameData, GameStatus, PlayerLevel, UserData};
use crate::errors::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

/// Total time allowed for one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest accepted academy account id.
pub const MAX_ACCOUNT_ID_LENGTH: usize = 64;

/// Whether `account_id` can be used as one path segment of an API URL.
///
/// Only ASCII letters, digits, `-` and `_` are accepted, so ids like `1/.` or
/// `2/../1` cannot be resolved to another account's URL.
#[must_use]
pub fn is_valid_account_id(account_id: &str) -> bool {
    !account_id.is_empty()
        && account_id.len() <= MAX_ACCOUNT_ID_LENGTH
        && account_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn check_account_id(account_id: &str) -> Result<()> {
    if is_valid_account_id(account_id) {
        Ok(())
    } else {
        Err(Error::InvalidAccountId {
            account_id: account_id.to_string(),
        })
    }
}

/// Read operations the bot needs from the academy platform.
#[cfg_attr(test, mockall::automock)]
#[allow(async_fn_in_trait)]
pub trait AcademyApi {
    /// Fetches the current state of a game.
    async fn get_status(&self, game_id: u64) -> Result<GameStatus>;
    /// Fetches the level requirement of one player in a game.
    async fn get_level(&self, game_id: u64, account_id: &str) -> Result<PlayerLevel>;
    /// Fetches the card table of a game.
    async fn get_table(&self, game_id: u64) -> Result<CardTable>;
    /// Fetches an academy account, used to check that it exists.
    async fn get_user(&self, account_id: &str) -> Result<UserData>;
}

/// `reqwest` backed [`AcademyApi`].
///
/// ```no_run
/// # async fn run() -> academy_bot::errors::Result<()> {
/// use academy_bot::core::academy::{AcademyApi, AcademyClient};
///
/// let client = AcademyClient::new("https://academy.beer")?;
/// let status = client.get_status(42).await?;
/// println!("{} cards drawn", status.game.cards.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AcademyClient {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    client: Client,
}

impl AcademyClient {
    /// Creates a client for the academy instance at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Request `/api/games/{id}/`.
    pub async fn get_game(&self, game_id: u64) -> Result<GameData> {
        info!("request game {game_id}");
        self.get_json(&format!("/api/games/{game_id}/")).await
    }

    async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned + std::fmt::Debug,
    {
        let url = format!("{}{path}", self.base_url);
        debug!("request {url}");

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("GET {url} failed: {e}");
            Error::UpstreamUnavailable {
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("GET {url} answered {status}: {body}");
            return Err(Error::UpstreamError {
                status: Some(status.as_u16()),
                message: format!("GET {path} answered {status}"),
            });
        }

        let parsed = response.json::<T>().await.map_err(|e| {
            error!("GET {url} returned an unreadable body: {e}");
            if e.is_timeout() {
                Error::UpstreamUnavailable {
                    message: e.to_string(),
                }
            } else {
                Error::UpstreamError {
                    status: Some(status.as_u16()),
                    message: e.to_string(),
                }
            }
        })?;

        debug!("response from {url} -> {parsed:?}");
        Ok(parsed)
    }
}

impl AcademyApi for AcademyClient {
    async fn get_status(&self, game_id: u64) -> Result<GameStatus> {
        Ok(GameStatus {
            game: self.get_game(game_id).await?,
        })
    }

    async fn get_level(&self, game_id: u64, account_id: &str) -> Result<PlayerLevel> {
        check_account_id(account_id)?;
        let game = self.get_game(game_id).await?;
        game.player_stats
            .into_iter()
            .find(|player| player.id == account_id)
            .map(|player| PlayerLevel { game_id, player })
            .ok_or_else(|| Error::NotInGame {
                game_id,
                game_account_id: account_id.to_string(),
            })
    }

    async fn get_table(&self, game_id: u64) -> Result<CardTable> {
        let game = self.get_game(game_id).await?;
        Ok(CardTable::from(&game))
    }

    async fn get_user(&self, account_id: &str) -> Result<UserData> {
        check_account_id(account_id)?;
        info!("request academy user {account_id}");
        self.get_json(&format!("/api/users/{account_id}/")).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::game_json;

    #[tokio::test]
    async fn test_get_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/games/42/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(game_json(42, 3))
            .create_async()
            .await;

        let client = AcademyClient::new(&server.url()).unwrap();
        let status = client.get_status(42).await.unwrap();
        assert_eq!(status.game.id, 42);
        assert_eq!(status.game.cards.len(), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_level() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/games/7/")
            .with_status(200)
            .with_body(game_json(7, 0))
            .create_async()
            .await;

        let client = AcademyClient::new(&server.url()).unwrap();
        let level = client.get_level(7, "2").await.unwrap();
        assert_eq!(level.player.username, "bob");
        assert_eq!(level.game_id, 7);

        let missing = client.get_level(7, "99").await;
        assert!(matches!(missing, Err(Error::NotInGame { game_id: 7, .. })));
    }

    #[tokio::test]
    async fn test_get_table() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/games/3/")
            .with_status(200)
            .with_body(game_json(3, 2))
            .create_async()
            .await;

        let client = AcademyClient::new(&format!("{}/", server.url())).unwrap();
        let table = client.get_table(3).await.unwrap();
        assert_eq!(table.players.len(), 2);
        assert_eq!(table.rounds[0], vec![Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_get_user() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/abc123/")
            .with_status(200)
            .with_body(r#"{"id": 5, "username": "carol"}"#)
            .create_async()
            .await;

        let client = AcademyClient::new(&server.url()).unwrap();
        assert_eq!(client.get_user("abc123").await.unwrap().username, "carol");
    }

    #[test]
    fn test_account_id_validation() {
        assert!(is_valid_account_id("1"));
        assert!(is_valid_account_id("abc_123-x"));
        assert!(!is_valid_account_id(""));
        assert!(!is_valid_account_id("1/."));
        assert!(!is_valid_account_id("2/../1"));
        assert!(!is_valid_account_id("1?x=2"));
        assert!(!is_valid_account_id("%31"));
        assert!(!is_valid_account_id(&"9".repeat(MAX_ACCOUNT_ID_LENGTH + 1)));
    }

    #[tokio::test]
    async fn test_dot_segments_never_reach_another_account() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users/1/")
            .with_status(200)
            .with_body(r#"{"id": 1, "username": "alice"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = AcademyClient::new(&server.url()).unwrap();
        assert_eq!(client.get_user("1").await.unwrap().id.as_deref(), Some("1"));
        for id in ["1/.", "2/../1", "./1"] {
            assert!(matches!(
                client.get_user(id).await,
                Err(Error::InvalidAccountId { .. })
            ));
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/nobody/")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = AcademyClient::new(&server.url()).unwrap();
        let result = client.get_user("nobody").await;
        assert!(matches!(
            result,
            Err(Error::UpstreamError {
                status: Some(404),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/games/1/")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let client = AcademyClient::new(&server.url()).unwrap();
        assert!(matches!(
            client.get_status(1).await,
            Err(Error::UpstreamError { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_is_upstream_unavailable() {
        // Nothing listens on port 9 of localhost
        let client = AcademyClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            client.get_status(1).await,
            Err(Error::UpstreamUnavailable { .. })
        ));
    }
}
