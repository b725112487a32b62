//! Link entity - The association between a chat user and an academy account.
//!
//! Both sides of the association are unique: a chat user holds at most one
//! academy account and an academy account belongs to at most one chat user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Linked account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "links")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID of the linked user
    #[sea_orm(unique)]
    pub chat_user_id: String,
    /// Academy account ID, kept opaque
    #[sea_orm(unique)]
    pub game_account_id: String,
    /// When the link was created
    pub created_at: DateTimeUtc,
}

/// `Link` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
