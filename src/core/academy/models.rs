//! Academy API payloads and the projections the bot shows to users.

use serde::{Deserialize, Deserializer};

/// Cards a player draws per game.
pub const ROUNDS: usize = 13;
/// Card value of an ace.
pub const ACE: u8 = 14;

/// Snapshot of a game as returned by `/api/games/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameData {
    /// Game id
    pub id: u64,
    /// Free text description, filled in when the game ends
    #[serde(default)]
    pub description: Option<String>,
    /// Cards drawn so far, in order
    #[serde(default)]
    pub cards: Vec<Card>,
    /// Players in seating order
    #[serde(default)]
    pub player_stats: Vec<PlayerStats>,
}

/// A drawn card.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Card {
    /// Card value, 2 to 14 (ace)
    pub value: u8,
    /// Chug time for aces, `None` while the chug is still running
    #[serde(default)]
    pub chug_duration_ms: Option<u64>,
}

/// Per player statistics of a game.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerStats {
    /// Academy account id, kept as an opaque string
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Academy username
    pub username: String,
    /// Full beers the player must have finished to be on level
    pub full_beers: u32,
    /// Extra sips on top of the full beers
    pub extra_sips: u32,
}

/// Account as returned by `/api/users/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserData {
    /// Account id in the form the platform reports it
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    /// Academy username
    pub username: String,
}

/// Where a game stands: its snapshot plus derived turn information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStatus {
    /// The game snapshot
    pub game: GameData,
}

impl GameStatus {
    /// Total number of cards the game will have.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.game.player_stats.len() * ROUNDS
    }

    /// Whether every card has been drawn.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.game.cards.len() >= self.total_cards()
    }

    /// Whether the last card is an ace whose chug has not finished.
    #[must_use]
    pub fn ace_pending(&self) -> bool {
        self.game
            .cards
            .last()
            .is_some_and(|card| card.value == ACE && card.chug_duration_ms.is_none())
    }

    /// Player who drew the last card.
    #[must_use]
    pub fn previous_player(&self) -> Option<&PlayerStats> {
        let players = &self.game.player_stats;
        if players.is_empty() || self.game.cards.is_empty() {
            return None;
        }
        let index = (self.game.cards.len() - 1) % players.len();
        players.get(index)
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> Option<&PlayerStats> {
        let players = &self.game.player_stats;
        if players.is_empty() {
            return None;
        }
        players.get(self.game.cards.len() % players.len())
    }
}

/// How much a player must have drunk to be on level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLevel {
    /// Game the level belongs to
    pub game_id: u64,
    /// The player
    pub player: PlayerStats,
}

/// Cards drawn per round and player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTable {
    /// Game the table belongs to
    pub game_id: u64,
    /// Players in seating order
    pub players: Vec<PlayerStats>,
    /// `ROUNDS` rows with one entry per player, `None` where no card is drawn yet
    pub rounds: Vec<Vec<Option<u8>>>,
}

impl From<&GameData> for CardTable {
    fn from(game: &GameData) -> Self {
        let player_count = game.player_stats.len();
        let rounds = (0..ROUNDS)
            .map(|round| {
                (0..player_count)
                    .map(|seat| game.cards.get(round * player_count + seat).map(|c| c.value))
                    .collect()
            })
            .collect();

        Self {
            game_id: game.id,
            players: game.player_stats.clone(),
            rounds,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Id {
    Text(String),
    Number(i64),
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        match id {
            Id::Text(text) => text,
            Id::Number(number) => number.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Id::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Id>::deserialize(deserializer)?.map(String::from))
}
