//! Entity module - Contains the SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod link;

pub use link::{Entity as Link, Model as LinkModel};
