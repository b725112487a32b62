//! Bot layer - Discord-specific interface
//!
//! This module connects the Discord gateway to the command dispatcher. Commands are
//! prefix based and parsed by [`crate::core::dispatcher`], so the poise framework is
//! only used for its event loop, setup hook and error handling.

/// Framework construction and the client run loop
pub mod framework;
/// Gateway event handlers
pub mod handlers;

use crate::{
    config::Settings,
    core::{Dispatcher, academy::AcademyClient},
};
use std::sync::Arc;

/// Shared data available to all event handlers.
pub struct BotData {
    /// Command dispatcher backed by the live academy client
    pub dispatcher: Arc<Dispatcher<AcademyClient>>,
    /// Resolved settings
    pub settings: Arc<Settings>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher<AcademyClient>>, settings: Arc<Settings>) -> Self {
        Self {
            dispatcher,
            settings,
        }
    }
}

pub use framework::run_bot;
