//! Handler-level fixtures: the usual [`AppState`] wired to an in-memory
//! SQLite database, plus direct row inserts.

use crate::{auth::CurrentUser, state::AppState, storage::MediaStorage};
use chrono::Utc;
use database::entities::{
    course_users, courses, lessons, media, modules, password_reset_tokens, role_assignments, users,
};
use models::{
    roles::{Actor, GlobalRole},
    status::CourseStatus,
};
use sea_orm::{ActiveValue::Set, ConnectionTrait, Database, EntityTrait, Schema};
use uuid::Uuid;

pub async fn state() -> AppState {
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

    let root = std::env::temp_dir().join(format!("media-test-{}", Uuid::new_v4()));
    AppState {
        db,
        storage: MediaStorage::new(root, "http://localhost/media".to_string()),
    }
}

/// Inserts a user with the given role grants and returns them as the
/// authenticated caller.
pub async fn caller(
    state: &AppState,
    name: &str,
    email: &str,
    roles: &[GlobalRole],
) -> CurrentUser {
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
    let user = users::Entity::insert(user)
        .exec_with_returning(&state.db)
        .await
        .unwrap();

    for role in roles {
        let grant = role_assignments::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            role: Set(*role),
            created_at: Set(now),
        };
        role_assignments::Entity::insert(grant)
            .exec(&state.db)
            .await
            .unwrap();
    }

    let actor = Actor::from_roles(user.id, roles);
    CurrentUser { user, actor }
}

pub async fn insert_course(state: &AppState, teacher_id: Option<Uuid>) -> Uuid {
    let now = Utc::now();
    let course = courses::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set("intro".to_string()),
        title: Set("Intro".to_string()),
        description: Set(None),
        status: Set(CourseStatus::Active),
        published_at: Set(None),
        starts_at: Set(None),
        ends_at: Set(None),
        metadata: Set(serde_json::json!({})),
        teacher_id: Set(teacher_id),
        created_by_id: Set(None),
        updated_by_id: Set(None),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    courses::Entity::insert(course)
        .exec(&state.db)
        .await
        .unwrap()
        .last_insert_id
}
