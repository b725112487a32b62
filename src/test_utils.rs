//! Shared test utilities for the academy bot.
//!
//! This module provides helpers for setting up test databases, settings and academy
//! API payloads with sensible defaults.

use crate::{
    config::{Settings, settings::FileSettings},
    core::academy::GameData,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Settings with prefix `!`, a dummy token and `admins` on the allow-list.
pub fn test_settings(admins: &[&str]) -> Arc<Settings> {
    test_settings_with(admins, &[])
}

/// Like [`test_settings`], with extra environment variables.
pub fn test_settings_with(admins: &[&str], env: &[(&str, &str)]) -> Arc<Settings> {
    let admin_ids = admins.join(",");
    let settings = Settings::from_sources(FileSettings::default(), |key| match key {
        "DISCORD_BOT_TOKEN" => Some("test-token".to_string()),
        "ADMIN_IDS" => Some(admin_ids.clone()),
        "GIT_COMMIT_HASH" => Some("cafebabe".to_string()),
        _ => env
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| (*value).to_string()),
    })
    .unwrap_or_else(|e| panic!("test settings must be valid: {e}"));
    Arc::new(settings)
}

/// JSON of a game between alice (id 1) and bob (id 2) with `cards` drawn.
///
/// Card values run 2, 3, 4, ... and never reach an ace.
pub fn game_json(game_id: u64, cards: usize) -> String {
    let cards: Vec<String> = (0..cards)
        .map(|i| format!(r#"{{"value": {}, "chug_duration_ms": null}}"#, 2 + i % 12))
        .collect();
    format!(
        r#"{{
            "id": {game_id},
            "description": null,
            "cards": [{}],
            "player_stats": [
                {{"id": 1, "username": "alice", "full_beers": 1, "extra_sips": 3}},
                {{"id": 2, "username": "bob", "full_beers": 0, "extra_sips": 1}}
            ]
        }}"#,
        cards.join(", ")
    )
}

/// Parsed form of [`game_json`].
pub fn sample_game(game_id: u64, cards: usize) -> GameData {
    serde_json::from_str(&game_json(game_id, cards))
        .unwrap_or_else(|e| panic!("sample game must parse: {e}"))
}
