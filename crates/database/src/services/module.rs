use crate::{
    entities::{lessons, modules},
    error::ServiceError,
    services::{FieldPatch, course::CourseService},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

pub struct CreateModule {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// When omitted the module is appended after the course's current last one.
    pub position: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub unpublish_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Default)]
pub struct UpdateModule {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: FieldPatch<String>,
    pub position: Option<i32>,
    pub published_at: FieldPatch<DateTime<Utc>>,
    pub unpublish_at: FieldPatch<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

pub struct ModuleService;

impl ModuleService {
    pub async fn create(
        db: &DatabaseConnection,
        actor_id: Uuid,
        course_id: Uuid,
        input: CreateModule,
        now: DateTime<Utc>,
    ) -> Result<modules::Model, ServiceError> {
        db.transaction::<_, modules::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                CourseService::require(txn, course_id).await?;

                let position = match input.position {
                    Some(position) => position,
                    None => Self::next_position(txn, course_id).await?,
                };

                let module = modules::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    course_id: Set(course_id),
                    title: Set(input.title),
                    slug: Set(input.slug),
                    description: Set(input.description),
                    position: Set(position),
                    published_at: Set(input.published_at),
                    unpublish_at: Set(input.unpublish_at),
                    metadata: Set(input.metadata.unwrap_or_else(|| serde_json::json!({}))),
                    created_by_id: Set(Some(actor_id)),
                    updated_by_id: Set(Some(actor_id)),
                    deleted_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let module = modules::Entity::insert(module)
                    .exec_with_returning(txn)
                    .await?;
                Ok(module)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn update(
        db: &DatabaseConnection,
        actor_id: Uuid,
        module_id: Uuid,
        input: UpdateModule,
        now: DateTime<Utc>,
    ) -> Result<modules::Model, ServiceError> {
        db.transaction::<_, modules::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let current = Self::require(txn, module_id).await?;

                let mut module: modules::ActiveModel = current.clone().into();
                if let Some(title) = input.title {
                    module.title = Set(title);
                }
                if let Some(slug) = input.slug {
                    module.slug = Set(slug);
                }
                if !input.description.is_keep() {
                    module.description = Set(input.description.apply(current.description.clone()));
                }
                if let Some(position) = input.position {
                    module.position = Set(position);
                }
                if !input.published_at.is_keep() {
                    module.published_at = Set(input.published_at.apply(current.published_at));
                }
                if !input.unpublish_at.is_keep() {
                    module.unpublish_at = Set(input.unpublish_at.apply(current.unpublish_at));
                }
                if let Some(metadata) = input.metadata {
                    module.metadata = Set(metadata);
                }
                module.updated_by_id = Set(Some(actor_id));
                module.updated_at = Set(now);

                let module = modules::Entity::update(module).exec(txn).await?;
                Ok(module)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    /// Soft-deletes the module and all of its lessons in one transaction, so a
    /// failure mid-sequence leaves no orphaned lessons.
    pub async fn delete(
        db: &DatabaseConnection,
        actor_id: Uuid,
        module_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let module = Self::require(txn, module_id).await?;

                lessons::Entity::update_many()
                    .col_expr(lessons::Column::DeletedAt, Expr::value(Some(now)))
                    .col_expr(lessons::Column::UpdatedAt, Expr::value(now))
                    .filter(lessons::Column::ModuleId.eq(module_id))
                    .filter(lessons::Column::DeletedAt.is_null())
                    .exec(txn)
                    .await?;

                let mut module: modules::ActiveModel = module.into();
                module.deleted_at = Set(Some(now));
                module.updated_by_id = Set(Some(actor_id));
                module.updated_at = Set(now);
                modules::Entity::update(module).exec(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        module_id: Uuid,
    ) -> Result<Option<modules::Model>, ServiceError> {
        let module = modules::Entity::find_by_id(module_id)
            .filter(modules::Column::DeletedAt.is_null())
            .one(conn)
            .await?;
        Ok(module)
    }

    pub async fn require<C: ConnectionTrait>(
        conn: &C,
        module_id: Uuid,
    ) -> Result<modules::Model, ServiceError> {
        Self::find(conn, module_id)
            .await?
            .ok_or(ServiceError::not_found("module"))
    }

    /// Live modules of a course in display order; position ties break by id.
    pub async fn list_for_course<C: ConnectionTrait>(
        conn: &C,
        course_id: Uuid,
    ) -> Result<Vec<modules::Model>, ServiceError> {
        let items = modules::Entity::find()
            .filter(modules::Column::CourseId.eq(course_id))
            .filter(modules::Column::DeletedAt.is_null())
            .order_by_asc(modules::Column::Position)
            .order_by_asc(modules::Column::Id)
            .all(conn)
            .await?;
        Ok(items)
    }

    async fn next_position<C: ConnectionTrait>(
        conn: &C,
        course_id: Uuid,
    ) -> Result<i32, ServiceError> {
        let max: Option<i32> = modules::Entity::find()
            .filter(modules::Column::CourseId.eq(course_id))
            .filter(modules::Column::DeletedAt.is_null())
            .select_only()
            .column_as(modules::Column::Position.max(), "max_position")
            .into_tuple()
            .one(conn)
            .await?
            .flatten();
        Ok(max.map_or(1, |max| max + 1))
    }
}
