use crate::{entities::media, error::ServiceError};
use chrono::{DateTime, Utc};
use models::media::{MediaCollection, MediaOwnerType};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use uuid::Uuid;

pub struct RecordUpload {
    pub owner_type: MediaOwnerType,
    pub owner_id: Uuid,
    pub collection: MediaCollection,
    pub name: String,
    pub file_name: String,
    pub path: String,
    pub mime_type: String,
    pub extension: Option<String>,
    pub size: i64,
    pub disk: String,
    pub uploaded_by_id: Option<Uuid>,
}

/// Result of promoting a temporary item into a permanent collection. The
/// caller moves the file from `previous_path` to the promoted row's `path` and
/// removes the files behind `replaced` after the transaction commits.
#[derive(Debug)]
pub struct PromotedMedia {
    pub media: media::Model,
    pub previous_path: String,
    pub replaced: Vec<media::Model>,
}

pub struct MediaService;

impl MediaService {
    /// Records an upload. For singular collections the previous item is
    /// deleted in the same transaction and returned for disk cleanup.
    pub async fn store(
        db: &DatabaseConnection,
        input: RecordUpload,
        now: DateTime<Utc>,
    ) -> Result<(media::Model, Vec<media::Model>), ServiceError> {
        db.transaction::<_, (media::Model, Vec<media::Model>), ServiceError>(|txn| {
            Box::pin(async move { Self::record_upload(txn, input, now).await })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn record_upload<C: ConnectionTrait>(
        conn: &C,
        input: RecordUpload,
        now: DateTime<Utc>,
    ) -> Result<(media::Model, Vec<media::Model>), ServiceError> {
        let replaced = if input.collection.is_singular() {
            Self::remove_for_owner(conn, input.owner_type, input.owner_id, input.collection).await?
        } else {
            Vec::new()
        };

        let model = media::ActiveModel {
            id: Set(Uuid::new_v4()),
            uuid: Set(Uuid::new_v4()),
            owner_type: Set(input.owner_type),
            owner_id: Set(input.owner_id),
            collection: Set(input.collection),
            name: Set(input.name),
            file_name: Set(input.file_name),
            path: Set(input.path),
            mime_type: Set(input.mime_type),
            extension: Set(input.extension),
            size: Set(input.size),
            disk: Set(input.disk),
            uploaded_by_id: Set(input.uploaded_by_id),
            created_at: Set(now),
        };

        let inserted = media::Entity::insert(model)
            .exec_with_returning(conn)
            .await?;
        Ok((inserted, replaced))
    }

    /// Moves a temporary item into `collection` on `owner`, replacing whatever
    /// the owner already had there. The temporary record ceases to exist as
    /// such: the same row is re-pointed at the permanent collection.
    pub async fn promote<C: ConnectionTrait>(
        conn: &C,
        media_id: Uuid,
        owner_type: MediaOwnerType,
        owner_id: Uuid,
        collection: MediaCollection,
    ) -> Result<PromotedMedia, ServiceError> {
        let item = media::Entity::find_by_id(media_id)
            .filter(media::Column::Collection.eq(MediaCollection::Temporary))
            .one(conn)
            .await?
            .ok_or(ServiceError::not_found("media"))?;

        let replaced = if collection.is_singular() {
            Self::remove_for_owner(conn, owner_type, owner_id, collection).await?
        } else {
            Vec::new()
        };

        let previous_path = item.path.clone();
        let new_path = format!(
            "{}/{}/{}",
            collection_dir(collection),
            item.uuid,
            item.file_name
        );

        let mut active: media::ActiveModel = item.into();
        active.owner_type = Set(owner_type);
        active.owner_id = Set(owner_id);
        active.collection = Set(collection);
        active.path = Set(new_path);
        let media = media::Entity::update(active).exec(conn).await?;

        Ok(PromotedMedia {
            media,
            previous_path,
            replaced,
        })
    }

    /// Deletes every item an owner holds in a collection; returns the removed
    /// rows so the caller can clean up the files.
    pub async fn remove_for_owner<C: ConnectionTrait>(
        conn: &C,
        owner_type: MediaOwnerType,
        owner_id: Uuid,
        collection: MediaCollection,
    ) -> Result<Vec<media::Model>, ServiceError> {
        let items = Self::find_for_owner(conn, owner_type, owner_id, collection).await?;
        if !items.is_empty() {
            media::Entity::delete_many()
                .filter(media::Column::Id.is_in(items.iter().map(|m| m.id).collect::<Vec<_>>()))
                .exec(conn)
                .await?;
        }
        Ok(items)
    }

    pub async fn find_for_owner<C: ConnectionTrait>(
        conn: &C,
        owner_type: MediaOwnerType,
        owner_id: Uuid,
        collection: MediaCollection,
    ) -> Result<Vec<media::Model>, ServiceError> {
        let items = media::Entity::find()
            .filter(media::Column::OwnerType.eq(owner_type))
            .filter(media::Column::OwnerId.eq(owner_id))
            .filter(media::Column::Collection.eq(collection))
            .all(conn)
            .await?;
        Ok(items)
    }

    pub async fn remove_avatar(
        db: &DatabaseConnection,
        user_id: Uuid,
    ) -> Result<Vec<media::Model>, ServiceError> {
        db.transaction::<_, Vec<media::Model>, ServiceError>(move |txn| {
            Box::pin(async move {
                Self::remove_for_owner(
                    txn,
                    MediaOwnerType::User,
                    user_id,
                    MediaCollection::Avatar,
                )
                .await
            })
        })
        .await
        .map_err(ServiceError::from)
    }
}

fn collection_dir(collection: MediaCollection) -> &'static str {
    match collection {
        MediaCollection::Temporary => "temporary",
        MediaCollection::Avatar => "avatar",
        MediaCollection::Cover => "cover",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn upload(owner_id: Uuid, collection: MediaCollection) -> RecordUpload {
        RecordUpload {
            owner_type: MediaOwnerType::User,
            owner_id,
            collection,
            name: "photo".to_string(),
            file_name: "photo.png".to_string(),
            path: "temporary/abc/photo.png".to_string(),
            mime_type: "image/png".to_string(),
            extension: Some("png".to_string()),
            size: 1024,
            disk: "local".to_string(),
            uploaded_by_id: Some(owner_id),
        }
    }

    #[tokio::test]
    async fn promote_moves_temporary_into_avatar_and_replaces_old() {
        let db = test_support::connect().await;
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let (first, _) =
            MediaService::store(&db, upload(user_id, MediaCollection::Temporary), now)
                .await
                .unwrap();
        let promoted = MediaService::promote(
            &db,
            first.id,
            MediaOwnerType::User,
            user_id,
            MediaCollection::Avatar,
        )
        .await
        .unwrap();
        assert_eq!(promoted.media.collection, MediaCollection::Avatar);
        assert!(promoted.replaced.is_empty());

        // a second promotion replaces the first avatar
        let (second, _) =
            MediaService::store(&db, upload(user_id, MediaCollection::Temporary), now)
                .await
                .unwrap();
        let promoted = MediaService::promote(
            &db,
            second.id,
            MediaOwnerType::User,
            user_id,
            MediaCollection::Avatar,
        )
        .await
        .unwrap();
        assert_eq!(promoted.replaced.len(), 1);
        assert_eq!(promoted.replaced[0].id, first.id);

        let avatars = MediaService::find_for_owner(
            &db,
            MediaOwnerType::User,
            user_id,
            MediaCollection::Avatar,
        )
        .await
        .unwrap();
        assert_eq!(avatars.len(), 1);
        assert_eq!(avatars[0].id, second.id);
    }

    #[tokio::test]
    async fn promote_rejects_non_temporary_items() {
        let db = test_support::connect().await;
        let user_id = Uuid::new_v4();
        let (avatar, _) = MediaService::store(&db, upload(user_id, MediaCollection::Avatar), Utc::now())
            .await
            .unwrap();

        let err = MediaService::promote(
            &db,
            avatar.id,
            MediaOwnerType::User,
            user_id,
            MediaCollection::Avatar,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn remove_avatar_returns_removed_rows() {
        let db = test_support::connect().await;
        let user_id = Uuid::new_v4();
        MediaService::store(&db, upload(user_id, MediaCollection::Avatar), Utc::now())
            .await
            .unwrap();

        let removed = MediaService::remove_avatar(&db, user_id).await.unwrap();
        assert_eq!(removed.len(), 1);
        let removed = MediaService::remove_avatar(&db, user_id).await.unwrap();
        assert!(removed.is_empty());
    }
}
