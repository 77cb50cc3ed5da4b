use crate::{
    entities::lessons,
    error::ServiceError,
    services::{FieldPatch, module::ModuleService},
};
use chrono::{DateTime, Utc};
use models::status::LessonContentType;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

pub struct CreateLesson {
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: String,
    pub content_type: LessonContentType,
    pub position: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Default)]
pub struct UpdateLesson {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: FieldPatch<String>,
    pub content: Option<String>,
    pub content_type: Option<LessonContentType>,
    pub position: Option<i32>,
    pub duration_minutes: FieldPatch<i32>,
    pub published_at: FieldPatch<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

pub struct LessonService;

impl LessonService {
    pub async fn create(
        db: &DatabaseConnection,
        actor_id: Uuid,
        module_id: Uuid,
        input: CreateLesson,
        now: DateTime<Utc>,
    ) -> Result<lessons::Model, ServiceError> {
        db.transaction::<_, lessons::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                ModuleService::require(txn, module_id).await?;

                let position = match input.position {
                    Some(position) => position,
                    None => Self::next_position(txn, module_id).await?,
                };

                let lesson = lessons::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    module_id: Set(module_id),
                    title: Set(input.title),
                    slug: Set(input.slug),
                    summary: Set(input.summary),
                    content: Set(input.content),
                    content_type: Set(input.content_type),
                    position: Set(position),
                    duration_minutes: Set(input.duration_minutes),
                    published_at: Set(input.published_at),
                    metadata: Set(input.metadata.unwrap_or_else(|| serde_json::json!({}))),
                    created_by_id: Set(Some(actor_id)),
                    updated_by_id: Set(Some(actor_id)),
                    deleted_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let lesson = lessons::Entity::insert(lesson)
                    .exec_with_returning(txn)
                    .await?;
                Ok(lesson)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn update(
        db: &DatabaseConnection,
        actor_id: Uuid,
        lesson_id: Uuid,
        input: UpdateLesson,
        now: DateTime<Utc>,
    ) -> Result<lessons::Model, ServiceError> {
        db.transaction::<_, lessons::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let current = Self::require(txn, lesson_id).await?;

                let mut lesson: lessons::ActiveModel = current.clone().into();
                if let Some(title) = input.title {
                    lesson.title = Set(title);
                }
                if let Some(slug) = input.slug {
                    lesson.slug = Set(slug);
                }
                if !input.summary.is_keep() {
                    lesson.summary = Set(input.summary.apply(current.summary.clone()));
                }
                if let Some(content) = input.content {
                    lesson.content = Set(content);
                }
                if let Some(content_type) = input.content_type {
                    lesson.content_type = Set(content_type);
                }
                if let Some(position) = input.position {
                    lesson.position = Set(position);
                }
                if !input.duration_minutes.is_keep() {
                    lesson.duration_minutes =
                        Set(input.duration_minutes.apply(current.duration_minutes));
                }
                if !input.published_at.is_keep() {
                    lesson.published_at = Set(input.published_at.apply(current.published_at));
                }
                if let Some(metadata) = input.metadata {
                    lesson.metadata = Set(metadata);
                }
                lesson.updated_by_id = Set(Some(actor_id));
                lesson.updated_at = Set(now);

                let lesson = lessons::Entity::update(lesson).exec(txn).await?;
                Ok(lesson)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn delete(
        db: &DatabaseConnection,
        actor_id: Uuid,
        lesson_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let lesson = Self::require(txn, lesson_id).await?;
                let mut lesson: lessons::ActiveModel = lesson.into();
                lesson.deleted_at = Set(Some(now));
                lesson.updated_by_id = Set(Some(actor_id));
                lesson.updated_at = Set(now);
                lessons::Entity::update(lesson).exec(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        lesson_id: Uuid,
    ) -> Result<Option<lessons::Model>, ServiceError> {
        let lesson = lessons::Entity::find_by_id(lesson_id)
            .filter(lessons::Column::DeletedAt.is_null())
            .one(conn)
            .await?;
        Ok(lesson)
    }

    pub async fn require<C: ConnectionTrait>(
        conn: &C,
        lesson_id: Uuid,
    ) -> Result<lessons::Model, ServiceError> {
        Self::find(conn, lesson_id)
            .await?
            .ok_or(ServiceError::not_found("lesson"))
    }

    /// Live lessons of a module in display order; position ties break by id.
    pub async fn list_for_module<C: ConnectionTrait>(
        conn: &C,
        module_id: Uuid,
    ) -> Result<Vec<lessons::Model>, ServiceError> {
        let items = lessons::Entity::find()
            .filter(lessons::Column::ModuleId.eq(module_id))
            .filter(lessons::Column::DeletedAt.is_null())
            .order_by_asc(lessons::Column::Position)
            .order_by_asc(lessons::Column::Id)
            .all(conn)
            .await?;
        Ok(items)
    }

    async fn next_position<C: ConnectionTrait>(
        conn: &C,
        module_id: Uuid,
    ) -> Result<i32, ServiceError> {
        let max: Option<i32> = lessons::Entity::find()
            .filter(lessons::Column::ModuleId.eq(module_id))
            .filter(lessons::Column::DeletedAt.is_null())
            .select_only()
            .column_as(lessons::Column::Position.max(), "max_position")
            .into_tuple()
            .one(conn)
            .await?
            .flatten();
        Ok(max.map_or(1, |max| max + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::module::ModuleService, test_support};

    #[tokio::test]
    async fn lesson_crud_round_trip() {
        let db = test_support::connect().await;
        let actor_id = test_support::insert_user(&db, "Admin", "admin@example.com").await;
        let now = Utc::now();
        let course = test_support::insert_course(&db, actor_id, "intro").await;
        let module = ModuleService::create(
            &db,
            actor_id,
            course,
            test_support::create_module_input("Week 1"),
            now,
        )
        .await
        .unwrap();

        let lesson = LessonService::create(
            &db,
            actor_id,
            module.id,
            test_support::create_lesson_input("Variables"),
            now,
        )
        .await
        .unwrap();
        assert_eq!(lesson.position, 1);
        assert_eq!(lesson.content_type, LessonContentType::Markdown);

        let lesson = LessonService::update(
            &db,
            actor_id,
            lesson.id,
            UpdateLesson {
                duration_minutes: FieldPatch::Set(45),
                summary: FieldPatch::Set("Bindings and shadowing".to_string()),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
        assert_eq!(lesson.duration_minutes, Some(45));

        // clearing with an explicit null is distinct from omitting
        let lesson = LessonService::update(
            &db,
            actor_id,
            lesson.id,
            UpdateLesson {
                duration_minutes: FieldPatch::Clear,
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
        assert_eq!(lesson.duration_minutes, None);
        assert_eq!(lesson.summary.as_deref(), Some("Bindings and shadowing"));

        LessonService::delete(&db, actor_id, lesson.id, now)
            .await
            .unwrap();
        assert!(LessonService::find(&db, lesson.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn creating_a_lesson_under_a_missing_module_is_not_found() {
        let db = test_support::connect().await;
        let actor_id = test_support::insert_user(&db, "Admin", "admin@example.com").await;
        let err = LessonService::create(
            &db,
            actor_id,
            Uuid::new_v4(),
            test_support::create_lesson_input("Orphan"),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}
