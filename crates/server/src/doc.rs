use crate::routes::{admin_user, course, health, lesson, media, module, profile};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        course::list_courses,
        course::create_course,
        course::get_course,
        course::update_course,
        course::delete_course,
        course::enroll_students,
        module::create_module,
        module::update_module,
        module::delete_module,
        lesson::create_lesson,
        lesson::update_lesson,
        lesson::delete_lesson,
        admin_user::list_users,
        admin_user::create_user,
        admin_user::get_user,
        admin_user::update_user,
        admin_user::delete_user,
        admin_user::issue_password_reset,
        media::upload,
        profile::update_profile,
        profile::upload_avatar,
        profile::delete_avatar
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Courses", description = "Course catalog and enrollment"),
        (name = "Modules", description = "Course content structure"),
        (name = "Lessons", description = "Lesson content"),
        (name = "Admin", description = "User administration"),
        (name = "Media", description = "File uploads"),
        (name = "Profile", description = "The caller's own account"),
    ),
    info(
        title = "Learning Platform API",
        version = "1.0.0",
        description = "Course, content and enrollment management API",
        license(
            name = "MIT OR Apache-2.0",
        )
    )
)]
pub struct ApiDoc;
