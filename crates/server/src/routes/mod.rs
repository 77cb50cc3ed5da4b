use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub mod admin_user;
pub mod course;
pub mod health;
pub mod lesson;
pub mod media;
pub mod module;
pub mod profile;

/// Everything behind the bearer-token layer.
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route(
            "/courses",
            get(course::list_courses).post(course::create_course),
        )
        .route(
            "/courses/{id}",
            get(course::get_course)
                .put(course::update_course)
                .delete(course::delete_course),
        )
        .route("/courses/{id}/students", post(course::enroll_students))
        .route("/courses/{id}/modules", post(module::create_module))
        .route(
            "/modules/{id}",
            put(module::update_module).delete(module::delete_module),
        )
        .route("/modules/{id}/lessons", post(lesson::create_lesson))
        .route(
            "/lessons/{id}",
            put(lesson::update_lesson).delete(lesson::delete_lesson),
        )
        .route(
            "/admin/users",
            get(admin_user::list_users).post(admin_user::create_user),
        )
        .route(
            "/admin/users/{id}",
            get(admin_user::get_user)
                .put(admin_user::update_user)
                .delete(admin_user::delete_user),
        )
        .route(
            "/admin/users/{id}/password-reset",
            post(admin_user::issue_password_reset),
        )
        .route("/media/uploads", post(media::upload))
        .route("/user-profile", patch(profile::update_profile))
        .route(
            "/avatar",
            post(profile::upload_avatar).delete(profile::delete_avatar),
        )
}
