//! Academy platform integration.
//!
//! - `client` - HTTP client for the academy API and the [`AcademyApi`] seam
//! - `models` - API payloads and the status, level and table projections
//! - `distribute` - splitting a crowd of players into games

pub mod client;
pub mod distribute;
pub mod models;

#[cfg(test)]
pub use client::MockAcademyApi;
pub use client::{AcademyApi, AcademyClient};
pub use models::{CardTable, GameData, GameStatus, PlayerLevel, PlayerStats, UserData};
