use models::media::{MediaCollection, MediaOwnerType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored file attached to one owning entity. Ownership is polymorphic over
/// the closed [`MediaOwnerType`] set rather than an open type tag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Public handle used in URLs, distinct from the row id.
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub owner_type: MediaOwnerType,
    pub owner_id: Uuid,
    pub collection: MediaCollection,
    pub name: String,
    pub file_name: String,
    /// Path relative to the disk root.
    pub path: String,
    pub mime_type: String,
    pub extension: Option<String>,
    pub size: i64,
    pub disk: String,
    pub uploaded_by_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
