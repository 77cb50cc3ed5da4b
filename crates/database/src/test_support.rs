//! Shared fixtures for service tests: an in-memory SQLite database with the
//! schema generated straight from the entities.

use crate::{
    entities::{
        course_users, courses, lessons, media, modules, password_reset_tokens, role_assignments,
        users,
    },
    services::{
        course::CreateCourse,
        lesson::CreateLesson,
        media::{MediaService, RecordUpload},
        module::CreateModule,
    },
};
use chrono::{DateTime, Utc};
use models::{
    media::{MediaCollection, MediaOwnerType},
    status::{CourseStatus, LessonContentType},
};
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use uuid::Uuid;

pub async fn connect() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let statements = [
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(role_assignments::Entity),
        schema.create_table_from_entity(courses::Entity),
        schema.create_table_from_entity(modules::Entity),
        schema.create_table_from_entity(lessons::Entity),
        schema.create_table_from_entity(course_users::Entity),
        schema.create_table_from_entity(media::Entity),
        schema.create_table_from_entity(password_reset_tokens::Entity),
    ];
    for statement in statements {
        db.execute(backend.build(&statement)).await.unwrap();
    }
    db
}

pub async fn insert_user(db: &DatabaseConnection, name: &str, email: &str) -> Uuid {
    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password: Set("$argon2id$test".to_string()),
        email_verified_at: Set(None),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    users::Entity::insert(user)
        .exec(db)
        .await
        .unwrap()
        .last_insert_id
}

pub async fn mark_email_verified(db: &DatabaseConnection, user_id: Uuid, at: DateTime<Utc>) {
    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    let mut user: users::ActiveModel = user.into();
    user.email_verified_at = Set(Some(at));
    users::Entity::update(user).exec(db).await.unwrap();
}

pub async fn insert_course(db: &DatabaseConnection, actor_id: Uuid, slug: &str) -> Uuid {
    let now = Utc::now();
    let course = courses::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug.to_string()),
        title: Set(slug.to_string()),
        description: Set(None),
        status: Set(CourseStatus::Active),
        published_at: Set(None),
        starts_at: Set(None),
        ends_at: Set(None),
        metadata: Set(serde_json::json!({})),
        teacher_id: Set(None),
        created_by_id: Set(Some(actor_id)),
        updated_by_id: Set(Some(actor_id)),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    courses::Entity::insert(course)
        .exec(db)
        .await
        .unwrap()
        .last_insert_id
}

pub async fn insert_temporary_media(db: &DatabaseConnection, uploader: Uuid) -> Uuid {
    let (item, _) = MediaService::store(
        db,
        RecordUpload {
            owner_type: MediaOwnerType::User,
            owner_id: uploader,
            collection: MediaCollection::Temporary,
            name: "upload".to_string(),
            file_name: "upload.png".to_string(),
            path: "temporary/fixture/upload.png".to_string(),
            mime_type: "image/png".to_string(),
            extension: Some("png".to_string()),
            size: 512,
            disk: "local".to_string(),
            uploaded_by_id: Some(uploader),
        },
        Utc::now(),
    )
    .await
    .unwrap();
    item.id
}

pub fn create_course_input(slug: &str, title: &str) -> CreateCourse {
    CreateCourse {
        slug: slug.to_string(),
        title: title.to_string(),
        description: None,
        status: CourseStatus::Draft,
        published_at: None,
        starts_at: None,
        ends_at: None,
        metadata: None,
        teacher_id: None,
    }
}

pub fn create_module_input(title: &str) -> CreateModule {
    CreateModule {
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        description: None,
        position: None,
        published_at: None,
        unpublish_at: None,
        metadata: None,
    }
}

pub fn create_lesson_input(title: &str) -> CreateLesson {
    CreateLesson {
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        summary: None,
        content: "# Lesson".to_string(),
        content_type: LessonContentType::Markdown,
        position: None,
        duration_minutes: None,
        published_at: None,
        metadata: None,
    }
}
