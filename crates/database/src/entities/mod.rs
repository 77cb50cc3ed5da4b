pub mod course_users;
pub mod courses;
pub mod lessons;
pub mod media;
pub mod modules;
pub mod password_reset_tokens;
pub mod role_assignments;
pub mod users;
