/// Database configuration and connection management
pub mod database;

/// Bot settings from the settings file and environment variables
pub mod settings;

pub use settings::Settings;
