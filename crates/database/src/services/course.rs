use crate::{
    entities::{courses, media, users},
    error::ServiceError,
    services::{FieldPatch, media::MediaService},
};
use chrono::{DateTime, Utc};
use models::{
    media::{MediaCollection, MediaOwnerType},
    status::CourseStatus,
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

pub struct CreateCourse {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub status: CourseStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub teacher_id: Option<Uuid>,
}

/// Whitelisted update set. `Option` fields are replaced when present;
/// `FieldPatch` fields additionally distinguish an explicit null.
#[derive(Default)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: FieldPatch<String>,
    pub status: Option<CourseStatus>,
    pub published_at: FieldPatch<DateTime<Utc>>,
    pub starts_at: FieldPatch<DateTime<Utc>>,
    pub ends_at: FieldPatch<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub teacher_id: FieldPatch<Uuid>,
    /// Cover attachment: omitted leaves the cover untouched, null clears it,
    /// an id promotes that temporary media item, replacing the old cover.
    pub cover: FieldPatch<Uuid>,
}

/// Side effects of a course update the HTTP layer must apply to disk after the
/// transaction commits.
#[derive(Default)]
pub struct CoverChange {
    /// (from, to) when a promoted file has to move on disk.
    pub moved: Option<(String, String)>,
    /// Files whose rows were deleted.
    pub removed: Vec<media::Model>,
}

pub struct CourseService;

impl CourseService {
    pub async fn create(
        db: &DatabaseConnection,
        actor_id: Uuid,
        input: CreateCourse,
        now: DateTime<Utc>,
    ) -> Result<courses::Model, ServiceError> {
        db.transaction::<_, courses::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                Self::ensure_slug_free(txn, &input.slug, None).await?;
                if let Some(teacher_id) = input.teacher_id {
                    Self::ensure_user_exists(txn, teacher_id).await?;
                }

                let course = courses::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    slug: Set(input.slug),
                    title: Set(input.title),
                    description: Set(input.description),
                    status: Set(input.status),
                    published_at: Set(input.published_at),
                    starts_at: Set(input.starts_at),
                    ends_at: Set(input.ends_at),
                    metadata: Set(input.metadata.unwrap_or_else(|| serde_json::json!({}))),
                    teacher_id: Set(input.teacher_id),
                    created_by_id: Set(Some(actor_id)),
                    updated_by_id: Set(Some(actor_id)),
                    deleted_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let course = courses::Entity::insert(course)
                    .exec_with_returning(txn)
                    .await?;
                Ok(course)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn update(
        db: &DatabaseConnection,
        actor_id: Uuid,
        course_id: Uuid,
        input: UpdateCourse,
        now: DateTime<Utc>,
    ) -> Result<(courses::Model, CoverChange), ServiceError> {
        db.transaction::<_, (courses::Model, CoverChange), ServiceError>(move |txn| {
            Box::pin(async move {
                let current = Self::require(txn, course_id).await?;

                if let FieldPatch::Set(teacher_id) = input.teacher_id {
                    Self::ensure_user_exists(txn, teacher_id).await?;
                }

                let mut cover_change = CoverChange::default();
                match input.cover {
                    FieldPatch::Keep => {}
                    FieldPatch::Clear => {
                        cover_change.removed = MediaService::remove_for_owner(
                            txn,
                            MediaOwnerType::Course,
                            course_id,
                            MediaCollection::Cover,
                        )
                        .await?;
                    }
                    FieldPatch::Set(media_id) => {
                        let promoted = MediaService::promote(
                            txn,
                            media_id,
                            MediaOwnerType::Course,
                            course_id,
                            MediaCollection::Cover,
                        )
                        .await?;
                        cover_change.moved =
                            Some((promoted.previous_path, promoted.media.path.clone()));
                        cover_change.removed = promoted.replaced;
                    }
                }

                let mut course: courses::ActiveModel = current.clone().into();
                if let Some(title) = input.title {
                    course.title = Set(title);
                }
                if !input.description.is_keep() {
                    course.description = Set(input.description.apply(current.description.clone()));
                }
                if let Some(status) = input.status {
                    // no transition guard: any status may follow any other
                    course.status = Set(status);
                }
                if !input.published_at.is_keep() {
                    course.published_at = Set(input.published_at.apply(current.published_at));
                }
                if !input.starts_at.is_keep() {
                    course.starts_at = Set(input.starts_at.apply(current.starts_at));
                }
                if !input.ends_at.is_keep() {
                    course.ends_at = Set(input.ends_at.apply(current.ends_at));
                }
                if let Some(metadata) = input.metadata {
                    course.metadata = Set(metadata);
                }
                if !input.teacher_id.is_keep() {
                    course.teacher_id = Set(input.teacher_id.apply(current.teacher_id));
                }
                course.updated_by_id = Set(Some(actor_id));
                course.updated_at = Set(now);

                let course = courses::Entity::update(course).exec(txn).await?;
                Ok((course, cover_change))
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    /// Soft delete: the row is retained and excluded from default queries.
    pub async fn delete(
        db: &DatabaseConnection,
        actor_id: Uuid,
        course_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let course = Self::require(txn, course_id).await?;
                let mut course: courses::ActiveModel = course.into();
                course.deleted_at = Set(Some(now));
                course.updated_by_id = Set(Some(actor_id));
                course.updated_at = Set(now);
                courses::Entity::update(course).exec(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        course_id: Uuid,
    ) -> Result<Option<courses::Model>, ServiceError> {
        let course = courses::Entity::find_by_id(course_id)
            .filter(courses::Column::DeletedAt.is_null())
            .one(conn)
            .await?;
        Ok(course)
    }

    pub async fn require<C: ConnectionTrait>(
        conn: &C,
        course_id: Uuid,
    ) -> Result<courses::Model, ServiceError> {
        Self::find(conn, course_id)
            .await?
            .ok_or(ServiceError::not_found("course"))
    }

    /// Paginated listing of live courses, newest first.
    pub async fn list(
        db: &DatabaseConnection,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<courses::Model>, u64), ServiceError> {
        let query = courses::Entity::find()
            .filter(courses::Column::DeletedAt.is_null())
            .order_by_desc(courses::Column::CreatedAt);

        let total_items = query.clone().count(db).await?;
        let paginator = query.paginate(db, per_page);
        let courses = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((courses, total_items))
    }

    async fn ensure_slug_free<C: ConnectionTrait>(
        conn: &C,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = courses::Entity::find()
            .filter(courses::Column::Slug.eq(slug))
            .filter(courses::Column::DeletedAt.is_null());
        if let Some(id) = exclude {
            query = query.filter(courses::Column::Id.ne(id));
        }
        if query.one(conn).await?.is_some() {
            return Err(ServiceError::validation("slug", "slug is already in use"));
        }
        Ok(())
    }

    async fn ensure_user_exists<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        users::Entity::find_by_id(user_id)
            .filter(users::Column::DeletedAt.is_null())
            .one(conn)
            .await?
            .ok_or(ServiceError::validation(
                "teacher_id",
                "referenced user does not exist",
            ))?;
        Ok(())
    }
}
