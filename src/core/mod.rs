//! Core business logic, independent of Discord.
//!
//! - `academy` - academy API client, payloads and player distribution
//! - `dispatcher` - command parsing, permission checks and replies
//! - `eval` - sandboxed expression evaluation for admins
//! - `format` - chat text helpers
//! - `fura` - text on the fura picture
//! - `link` - chat user to academy account links
//! - `registry` - the command table

pub mod academy;
pub mod dispatcher;
pub mod eval;
pub mod format;
pub mod fura;
pub mod link;
pub mod registry;

pub use dispatcher::{Dispatcher, Incoming, Reply};
