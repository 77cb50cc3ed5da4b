use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The closed set of entities a media item can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum MediaOwnerType {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "course")]
    Course,
    #[sea_orm(string_value = "lesson")]
    Lesson,
}

/// Named attachment slot. `Temporary` holds fresh uploads until they are
/// promoted into a permanent collection; `Avatar` and `Cover` hold at most one
/// item per owner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum MediaCollection {
    #[default]
    #[sea_orm(string_value = "temporary")]
    Temporary,
    #[sea_orm(string_value = "avatar")]
    Avatar,
    #[sea_orm(string_value = "cover")]
    Cover,
}

impl MediaCollection {
    /// Collections that hold at most one item per owner; adding a new item
    /// replaces the previous one.
    pub fn is_singular(self) -> bool {
        matches!(self, MediaCollection::Avatar | MediaCollection::Cover)
    }
}
